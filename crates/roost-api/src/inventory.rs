//! Typed client for the Roost inventory API.
//!
//! Three operations: look a host up by its machine identifier, check in with
//! fresh canonical facts, and delete a host record. Lookup distinguishes
//! "the service says there is no such host" (`Ok(None)`) from "the service
//! could not be asked" (an error), because the registration controller must
//! never treat absence-of-evidence as evidence-of-absence.

use crate::{ApiError, Method, Transport};
use serde::{Deserialize, Serialize};

/// A host record as the inventory service reports it. Unknown fields are
/// ignored; the client only ever holds a transient read-only copy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Host {
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub fqdn: Option<String>,
    #[serde(default)]
    pub machine_id: Option<String>,
    #[serde(default)]
    pub last_check_in: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HostQueryPage {
    #[serde(default)]
    total: u64,
    #[serde(default)]
    results: Vec<Host>,
}

pub struct Inventory<T: Transport> {
    transport: T,
}

impl<T: Transport> Inventory<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// Ask the inventory whether a host record exists for `machine_id`.
    /// `Ok(None)` means the service answered and reported no match.
    pub fn find_host(&self, machine_id: &str) -> Result<Option<Host>, ApiError> {
        let response = self.transport.request(
            Method::Get,
            "/hosts",
            &[("machine_id", machine_id)],
            &[],
            None,
        )?;
        if !response.is_success() {
            return Err(ApiError::Status {
                status: response.status,
                body: response.body_excerpt(),
            });
        }
        let page: HostQueryPage = serde_json::from_slice(&response.body)
            .map_err(|e| ApiError::Malformed(e.to_string()))?;
        tracing::debug!("inventory lookup matched {} host(s)", page.total);
        Ok(page.results.into_iter().next())
    }

    /// Upload canonical facts as a light check-in. Returns the updated host
    /// record on a success-class response.
    pub fn checkin(&self, facts: &serde_json::Value) -> Result<Host, ApiError> {
        let body = serde_json::to_vec(facts).map_err(|e| ApiError::Malformed(e.to_string()))?;
        let response = self.transport.request(
            Method::Post,
            "/hosts/checkin",
            &[],
            &[("Content-Type", "application/json")],
            Some(&body),
        )?;
        if !response.is_success() {
            return Err(ApiError::Status {
                status: response.status,
                body: response.body_excerpt(),
            });
        }
        serde_json::from_slice(&response.body).map_err(|e| ApiError::Malformed(e.to_string()))
    }

    /// Delete a host record. A 404 means the record is already gone, which
    /// is what the caller wanted; it is not an error.
    pub fn delete_host(&self, id: &str) -> Result<(), ApiError> {
        let response =
            self.transport
                .request(Method::Delete, &format!("/hosts/{id}"), &[], &[], None)?;
        if response.status == 404 {
            tracing::debug!("host {id} already absent from inventory");
            return Ok(());
        }
        if !response.is_success() {
            return Err(ApiError::Status {
                status: response.status,
                body: response.body_excerpt(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::HttpResponse;
    use std::cell::RefCell;
    use std::collections::VecDeque;

    struct MockTransport {
        responses: RefCell<VecDeque<HttpResponse>>,
        calls: RefCell<Vec<(Method, String, String)>>,
    }

    impl MockTransport {
        fn with(responses: Vec<HttpResponse>) -> Self {
            Self {
                responses: RefCell::new(responses.into()),
                calls: RefCell::new(Vec::new()),
            }
        }
    }

    impl Transport for MockTransport {
        fn request(
            &self,
            method: Method,
            endpoint: &str,
            query: &[(&str, &str)],
            _headers: &[(&str, &str)],
            _body: Option<&[u8]>,
        ) -> Result<HttpResponse, ApiError> {
            let query = query
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join("&");
            self.calls
                .borrow_mut()
                .push((method, endpoint.to_owned(), query));
            Ok(self
                .responses
                .borrow_mut()
                .pop_front()
                .expect("unexpected request"))
        }
    }

    fn json_response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            headers: vec![("Content-Type".to_owned(), "application/json".to_owned())],
            body: body.as_bytes().to_vec(),
        }
    }

    #[test]
    fn find_host_returns_first_match() {
        let transport = MockTransport::with(vec![json_response(
            200,
            r#"{"total": 1, "results": [{"id": "h-1", "fqdn": "node.example.org"}]}"#,
        )]);
        let inventory = Inventory::new(&transport);
        let host = inventory.find_host("abc").unwrap().unwrap();
        assert_eq!(host.id, "h-1");
        assert_eq!(host.fqdn.as_deref(), Some("node.example.org"));
        let calls = transport.calls.borrow();
        assert_eq!(calls[0].0, Method::Get);
        assert_eq!(calls[0].1, "/hosts");
        assert_eq!(calls[0].2, "machine_id=abc");
    }

    #[test]
    fn find_host_empty_page_is_absent_not_error() {
        let transport =
            MockTransport::with(vec![json_response(200, r#"{"total": 0, "results": []}"#)]);
        let inventory = Inventory::new(&transport);
        assert!(inventory.find_host("abc").unwrap().is_none());
    }

    #[test]
    fn find_host_unexpected_status_is_an_error() {
        let transport = MockTransport::with(vec![json_response(503, "upstream down")]);
        let inventory = Inventory::new(&transport);
        let err = inventory.find_host("abc").unwrap_err();
        match err {
            ApiError::Status { status, body } => {
                assert_eq!(status, 503);
                assert!(body.contains("upstream down"));
            }
            other => panic!("expected Status error, got {other:?}"),
        }
    }

    #[test]
    fn find_host_garbage_body_is_malformed() {
        let transport = MockTransport::with(vec![json_response(200, "not json")]);
        let inventory = Inventory::new(&transport);
        assert!(matches!(
            inventory.find_host("abc"),
            Err(ApiError::Malformed(_))
        ));
    }

    #[test]
    fn checkin_returns_updated_host() {
        let transport = MockTransport::with(vec![json_response(
            200,
            r#"{"id": "h-1", "last_check_in": "2026-08-07T12:00:00+00:00"}"#,
        )]);
        let inventory = Inventory::new(&transport);
        let facts = serde_json::json!({"fqdn": "node.example.org"});
        let host = inventory.checkin(&facts).unwrap();
        assert_eq!(host.id, "h-1");
        assert!(host.last_check_in.is_some());
        let calls = transport.calls.borrow();
        assert_eq!(calls[0].0, Method::Post);
        assert_eq!(calls[0].1, "/hosts/checkin");
    }

    #[test]
    fn checkin_failure_carries_status_and_body() {
        let transport = MockTransport::with(vec![json_response(400, r#"{"detail": "bad facts"}"#)]);
        let inventory = Inventory::new(&transport);
        let err = inventory.checkin(&serde_json::json!({})).unwrap_err();
        match err {
            ApiError::Status { status, body } => {
                assert_eq!(status, 400);
                assert!(body.contains("bad facts"));
            }
            other => panic!("expected Status error, got {other:?}"),
        }
    }

    #[test]
    fn delete_host_tolerates_not_found() {
        let transport = MockTransport::with(vec![json_response(404, "no such host")]);
        let inventory = Inventory::new(&transport);
        inventory.delete_host("h-1").unwrap();
        let calls = transport.calls.borrow();
        assert_eq!(calls[0].0, Method::Delete);
        assert_eq!(calls[0].1, "/hosts/h-1");
    }

    #[test]
    fn delete_host_success_and_failure() {
        let transport = MockTransport::with(vec![
            json_response(204, ""),
            json_response(500, "boom"),
        ]);
        let inventory = Inventory::new(&transport);
        inventory.delete_host("h-1").unwrap();
        assert!(matches!(
            inventory.delete_host("h-1"),
            Err(ApiError::Status { status: 500, .. })
        ));
    }
}
