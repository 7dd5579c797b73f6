//! Vendor call seams.

use async_trait::async_trait;
use std::sync::Arc;

use crate::classify::StatusClassifier;
use crate::error::VendorError;
use crate::types::{AuxiliaryState, StatusPage};

/// A vendor operation that runs as an asynchronous job.
///
/// Implementations perform the HTTP (or SDK) calls only; they do not classify
/// errors. Classification happens once, in the poll executor, using
/// [`JobVendor::classifier`].
#[async_trait]
pub trait JobVendor: Send + Sync {
    type Request: Send + Sync;

    /// Provider id used in logs.
    fn provider_id(&self) -> &str;

    /// Status vocabulary and not-found signatures of this vendor.
    fn classifier(&self) -> &StatusClassifier;

    /// Call the vendor "start" endpoint.
    ///
    /// `job_name` is the client-chosen name (vendors that assign their own IDs
    /// may ignore it). `auxiliary` is the ready auxiliary resource to attach,
    /// if any. Returns the primary resource ID.
    async fn start_job(
        &self,
        job_name: &str,
        request: &Self::Request,
        auxiliary: Option<&str>,
    ) -> Result<String, VendorError>;

    /// Call the vendor "status" endpoint, optionally for a later result page.
    async fn job_status(
        &self,
        job_id: &str,
        cursor: Option<&str>,
    ) -> Result<StatusPage, VendorError>;
}

/// A vendor-side resource the primary job depends on.
#[async_trait]
pub trait AuxiliaryVendor<Spec: Send + Sync>: Send + Sync {
    /// Begin provisioning; returns the auxiliary resource ID.
    async fn create_auxiliary(&self, name: &str, spec: &Spec) -> Result<String, VendorError>;

    async fn auxiliary_state(&self, id: &str) -> Result<AuxiliaryState, VendorError>;

    /// Discard a resource that will not be used.
    async fn delete_auxiliary(&self, id: &str) -> Result<(), VendorError>;
}

#[async_trait]
impl<V: JobVendor + ?Sized> JobVendor for Arc<V> {
    type Request = V::Request;

    fn provider_id(&self) -> &str {
        (**self).provider_id()
    }

    fn classifier(&self) -> &StatusClassifier {
        (**self).classifier()
    }

    async fn start_job(
        &self,
        job_name: &str,
        request: &Self::Request,
        auxiliary: Option<&str>,
    ) -> Result<String, VendorError> {
        (**self).start_job(job_name, request, auxiliary).await
    }

    async fn job_status(
        &self,
        job_id: &str,
        cursor: Option<&str>,
    ) -> Result<StatusPage, VendorError> {
        (**self).job_status(job_id, cursor).await
    }
}

#[async_trait]
impl<Spec, A> AuxiliaryVendor<Spec> for Arc<A>
where
    Spec: Send + Sync,
    A: AuxiliaryVendor<Spec> + ?Sized,
{
    async fn create_auxiliary(&self, name: &str, spec: &Spec) -> Result<String, VendorError> {
        (**self).create_auxiliary(name, spec).await
    }

    async fn auxiliary_state(&self, id: &str) -> Result<AuxiliaryState, VendorError> {
        (**self).auxiliary_state(id).await
    }

    async fn delete_auxiliary(&self, id: &str) -> Result<(), VendorError> {
        (**self).delete_auxiliary(id).await
    }
}
