use serde::Deserialize;
use serde::de::IgnoredAny;
use serde_json::Value;

use crate::{
    BucketAcl, BucketInfo, FetchController, FileUpload, FormPayload, PostBucket, PostCms, Result,
    SfsObject, cross_log,
};

#[derive(Deserialize)]
struct BucketPayload {
    bucket: BucketInfo,
}

#[derive(Deserialize)]
struct ObjectPayload {
    object: SfsObject,
}

impl PostCms {
    /// Create a bucket named `name` with access control `acl`.
    ///
    /// Returns a handle named after the alias the backend assigned.
    ///
    /// # Errors
    /// - [`crate::Error::Api`] if the backend refuses (name taken, not allowed, ...).
    /// - [`crate::Error::Request`] on transport failure.
    pub async fn create_bucket(&self, name: &str, acl: BucketAcl) -> Result<PostBucket> {
        cross_log!(info, "Creating bucket {name} (acl {})", acl.code());
        let form = FormPayload::new()
            .text("alias", name)
            .value("acl", Value::from(acl.code()));
        let BucketPayload { bucket } = self.api.mutation("create-bucket", Some(form), None).await?;
        Ok(self.bucket(bucket.alias))
    }

    /// Delete the bucket named `name`.
    ///
    /// # Errors
    /// - [`crate::Error::Api`] if the backend refuses.
    /// - [`crate::Error::Request`] on transport failure.
    pub async fn delete_bucket(&self, name: &str) -> Result<()> {
        cross_log!(info, "Deleting bucket {name}");
        let form = FormPayload::new().text("id", name);
        let _: IgnoredAny = self.api.mutation("delete-bucket", Some(form), None).await?;
        Ok(())
    }

    /// Replace the access control of the bucket named `name`.
    ///
    /// # Errors
    /// - [`crate::Error::Api`] if the backend refuses.
    /// - [`crate::Error::Request`] on transport failure.
    pub async fn update_bucket_acl(&self, name: &str, acl: BucketAcl) -> Result<()> {
        cross_log!(info, "Updating ACL of bucket {name} to {}", acl.code());
        let form = FormPayload::new()
            .text("id", name)
            .value("acl", Value::from(acl.code()));
        let _: IgnoredAny = self.api.mutation("update-bucket", Some(form), None).await?;
        Ok(())
    }

    /// Upload a file, optionally under `path`.
    ///
    /// Progress is reported to the controller's
    /// [`on_progress`](FetchController::on_progress) callback while the body is sent.
    ///
    /// # Example
    /// ```no_run
    /// # async fn ex(cms: postcms::PostCms) -> postcms::Result<()> {
    /// use postcms::{FetchController, FileUpload};
    ///
    /// let file = FileUpload::from_path("cover.png").await?.mime("image/png");
    /// let fc = FetchController::new()
    ///     .on_progress(|loaded, total| println!("{loaded}/{total} bytes"));
    /// let object = cms.upload_file(file, Some("/covers"), Some(&fc)).await?;
    /// println!("stored as {}", object.hashname);
    /// # Ok(()) }
    /// ```
    ///
    /// # Errors
    /// - [`crate::Error::Api`] if the backend refuses.
    /// - [`crate::Error::Request`] on transport failure or abort.
    pub async fn upload_file(
        &self,
        file: FileUpload,
        path: Option<&str>,
        controller: Option<&FetchController>,
    ) -> Result<SfsObject> {
        cross_log!(info, "Uploading {} bytes", file.len());
        let mut form = FormPayload::new().file("file", file);
        if let Some(path) = path {
            form = form.text("path", path);
        }
        let ObjectPayload { object } = self
            .api
            .mutation("upload-file", Some(form), controller)
            .await?;
        cross_log!(info, "Uploaded object {}", object.id);
        Ok(object)
    }
}
