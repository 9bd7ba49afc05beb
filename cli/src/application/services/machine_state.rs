//! Application service: read a machine's last published state.

use puda_common::{derive_namespace, validate_machine_id};

use crate::application::ports::StateStore;
use crate::domain::state::decode_record;
use crate::domain::{MachineState, StateError};

/// Reader for per-machine state records. Never writes, never caches.
pub struct StateAccessor<'a, S: StateStore> {
    store: &'a S,
    namespace_prefix: &'a str,
}

impl<'a, S: StateStore> StateAccessor<'a, S> {
    #[must_use]
    pub fn new(store: &'a S, namespace_prefix: &'a str) -> Self {
        Self {
            store,
            namespace_prefix,
        }
    }

    /// Namespace that holds `machine_id`'s record.
    #[must_use]
    pub fn namespace_for(&self, machine_id: &str) -> String {
        derive_namespace(self.namespace_prefix, machine_id)
    }

    /// Fetch the current state of `machine_id`.
    ///
    /// A machine that never published state yields `MachineState::Absent`.
    ///
    /// # Errors
    ///
    /// - `InvalidMachineId` for an empty or subject-unsafe id
    /// - `Transport` if the store cannot be reached
    /// - `Decode` if the stored entry is not a JSON object
    pub async fn get_state(&self, machine_id: &str) -> Result<MachineState, StateError> {
        validate_machine_id(machine_id).map_err(|reason| StateError::InvalidMachineId {
            machine_id: machine_id.to_string(),
            reason: reason.to_string(),
        })?;

        let namespace = self.namespace_for(machine_id);
        tracing::debug!(machine_id, namespace = %namespace, "reading machine state");

        match self.store.read(&namespace, machine_id).await? {
            Some(raw) => decode_record(machine_id, &raw).map(MachineState::Present),
            None => {
                tracing::info!(machine_id, namespace = %namespace, "no state published");
                Ok(MachineState::Absent)
            }
        }
    }
}
