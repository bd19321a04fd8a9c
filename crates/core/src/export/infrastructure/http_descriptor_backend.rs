use std::time::Duration;

use reqwest::StatusCode;

use crate::export::domain::descriptor_backend::{DescriptorBackend, DescriptorRecord};
use crate::export::domain::export_error::ExportError;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Posts descriptor records as JSON to an HTTP endpoint.
///
/// Only `200 OK` counts as accepted; any other status is a rejection.
pub struct HttpDescriptorBackend {
    client: reqwest::blocking::Client,
    url: String,
}

impl HttpDescriptorBackend {
    pub fn new(url: &str, timeout: Duration) -> Result<Self, Box<dyn std::error::Error>> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            url: url.to_string(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl DescriptorBackend for HttpDescriptorBackend {
    fn submit(&self, record: &DescriptorRecord) -> Result<(), ExportError> {
        let response = self
            .client
            .post(&self.url)
            .json(record)
            .send()
            .map_err(|e| ExportError::BackendUnavailable(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::OK {
            return Ok(());
        }

        let body = response.text().unwrap_or_default();
        Err(ExportError::BackendRejected {
            status: status.as_u16(),
            body,
        })
    }
}
