//! The registration state machine.
//!
//! Three entry points: register, unregister, check-in. Each one recomputes
//! the derived registration status, runs its guard against the remote
//! lookup, and sequences the local marker writes so that a failure at any
//! stage leaves the host in a consistent state. Failures never propagate
//! out of this module: they are logged in full here and reduced to an
//! `Outcome` carrying a short, stage-identifying message. Nothing is
//! retried within an invocation.

use crate::collector::Collector;
use crate::state::LocalState;
use crate::status::RegistrationStatus;
use crate::CoreError;
use chrono::Utc;
use roost_api::{Host, Ingress, Inventory, Transport};
use serde::Serialize;
use uuid::Uuid;

/// User-facing result of one controller operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Outcome {
    pub message: String,
    pub ok: bool,
}

impl Outcome {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ok: true,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ok: false,
        }
    }
}

pub struct Controller<'a, C: Collector> {
    state: &'a LocalState,
    collector: &'a C,
}

impl<'a, C: Collector> Controller<'a, C> {
    pub fn new(state: &'a LocalState, collector: &'a C) -> Self {
        Self { state, collector }
    }

    /// Ask the inventory for this system's host record, keyed on the local
    /// machine identifier. Without one there is nothing to look up and the
    /// answer is "absent" without a network call.
    fn lookup(&self, inventory: &Inventory<impl Transport>) -> Result<Option<Host>, CoreError> {
        let Some(machine_id) = self.state.machine_id()? else {
            tracing::debug!("no local machine-id, skipping inventory lookup");
            return Ok(None);
        };
        Ok(inventory.find_host(&machine_id)?)
    }

    fn derive_status(&self, remote: &Result<Option<Host>, CoreError>) -> RegistrationStatus {
        let status = RegistrationStatus::derive(
            remote.as_ref().map(Option::is_some).ok(),
            &self.state.read_markers(),
        );
        tracing::debug!("derived registration status: {status}");
        status
    }

    /// `Unregistered -> Registered`.
    ///
    /// Guard: the remote lookup must report no host. The `.registered`
    /// marker is only written after the archive upload succeeded; every
    /// earlier failure reports its own stage and leaves no such marker.
    pub fn register(
        &self,
        inventory: &Inventory<impl Transport>,
        ingress: &Ingress<impl Transport>,
    ) -> Outcome {
        let remote = self.lookup(inventory);
        self.derive_status(&remote);
        match remote {
            Err(e) => {
                tracing::error!("inventory lookup failed: {e}");
                return Outcome::failure("Could not contact the inventory service.");
            }
            Ok(Some(host)) => {
                tracing::debug!("inventory already lists this system as host {}", host.id);
                return Outcome::failure("This host is already registered.");
            }
            Ok(None) => {}
        }

        tracing::info!("registering the host");
        if let Err(e) = self.collector.load() {
            tracing::error!("could not load the collector: {e}");
            return Outcome::failure("Could not load the collector.");
        }

        let machine_id = Uuid::new_v4().to_string();
        if let Err(e) = self.state.write_machine_id(&machine_id) {
            tracing::error!("could not persist the machine identifier: {e}");
            return Outcome::failure("Could not write the machine identifier.");
        }
        tracing::info!("generated machine-id {machine_id}");

        let facts = match self.collector.canonical_facts() {
            Ok(facts) => facts,
            Err(e) => {
                tracing::error!("could not collect canonical facts: {e}");
                return Outcome::failure("Could not collect canonical facts.");
            }
        };
        let archive = match self.collector.advisory_archive() {
            Ok(archive) => archive,
            Err(e) => {
                tracing::error!("could not collect advisory data: {e}");
                return Outcome::failure("Could not collect advisory data.");
            }
        };

        match ingress.upload(&archive.path, &archive.content_type, &facts) {
            Ok(receipt) => {
                tracing::debug!("ingress accepted the upload as request {}", receipt.request_id);
            }
            Err(e) => {
                tracing::error!("could not upload to the ingress service: {e}");
                return Outcome::failure("Could not register with the inventory service.");
            }
        }

        // The upload went through; the markers must now say "registered"
        // and nothing else.
        let updated = self
            .state
            .remove_unregistered_marker()
            .and_then(|()| self.state.write_registered_marker(Utc::now()));
        if let Err(e) = updated {
            tracing::error!("could not update registration markers: {e}");
            return Outcome::failure("Could not update registration markers.");
        }
        Outcome::success("The host has been registered.")
    }

    /// `Registered | Unregistered -> Unregistered`.
    ///
    /// Normalizes any partial state to fully unregistered: best-effort
    /// remote delete when a host is found, unconditional local cleanup,
    /// and an `.unregistered` marker afterwards. Reports "already
    /// unregistered" only when none of that changed anything observable.
    pub fn unregister(&self, inventory: &Inventory<impl Transport>) -> Outcome {
        tracing::info!("unregistering the host");
        let remote = self.lookup(inventory);
        self.derive_status(&remote);

        // Registration is tied to several weak conditions; gather evidence
        // of a prior registration as cleanup proceeds.
        let mut was_registered = false;
        match remote {
            Ok(Some(host)) => {
                // A live remote record dominates any stale local marker.
                was_registered = true;
                tracing::debug!("deleting host {} from the inventory", host.id);
                if let Err(e) = inventory.delete_host(&host.id) {
                    tracing::warn!("could not delete host {} from the inventory: {e}", host.id);
                }
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!("inventory lookup failed, continuing with local cleanup: {e}");
            }
        }

        let present = self.state.clear_registration_artifacts();
        if !present.is_empty() {
            was_registered = true;
        }

        if !self.state.read_markers().unregistered {
            was_registered = true;
            if let Err(e) = self.state.write_unregistered_marker(Utc::now()) {
                tracing::error!("could not write the unregistered marker: {e}");
                return Outcome::failure("Could not update registration markers.");
            }
        }

        if was_registered {
            Outcome::success("The host has been unregistered.")
        } else {
            Outcome::failure("The host is already unregistered.")
        }
    }

    /// `Registered -> CheckedIn -> Registered`.
    ///
    /// Guard: the remote lookup must return a host. Check-in never mutates
    /// local markers, on success or failure.
    pub fn checkin(&self, inventory: &Inventory<impl Transport>) -> Outcome {
        let remote = self.lookup(inventory);
        self.derive_status(&remote);
        let host = match remote {
            Err(e) => {
                tracing::error!("inventory lookup failed: {e}");
                return Outcome::failure("Could not contact the inventory service.");
            }
            Ok(None) => return Outcome::failure("This host is not registered."),
            Ok(Some(host)) => host,
        };

        tracing::info!("checking in host {}", host.id);
        if let Err(e) = self.collector.load() {
            tracing::error!("could not load the collector: {e}");
            return Outcome::failure("Could not load the collector.");
        }
        let facts = match self.collector.canonical_facts() {
            Ok(facts) => facts,
            Err(e) => {
                tracing::error!("could not collect canonical facts: {e}");
                return Outcome::failure("Could not collect canonical facts.");
            }
        };

        match inventory.checkin(&facts) {
            Ok(updated) => {
                tracing::info!(
                    "inventory acknowledged the check-in for {} (last check-in {})",
                    updated.id,
                    updated.last_check_in.as_deref().unwrap_or("unknown")
                );
                Outcome::success("Successfully checked in.")
            }
            Err(e) => {
                tracing::error!("check-in failed: {e}");
                Outcome::failure("Could not check in with the inventory service.")
            }
        }
    }
}
