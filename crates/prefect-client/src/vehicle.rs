//! Vehicle handle: one vehicle's snapshot plus commands against it

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, instrument};

use crate::error::{PrefectError, Result};
use crate::session::Session;
use crate::types::{LookupCode, VehicleSnapshot};

/// A vehicle on the account, bound to the session that listed it
///
/// Every command re-selects this vehicle on the server immediately before
/// sending, inside the session's select+command guard.
#[derive(Debug, Clone)]
pub struct Vehicle {
    session: Arc<Session>,
    snapshot: VehicleSnapshot,
}

impl Vehicle {
    pub(crate) fn new(session: Arc<Session>, snapshot: VehicleSnapshot) -> Self {
        Self { session, snapshot }
    }

    pub fn vin(&self) -> &str {
        &self.snapshot.vin
    }

    /// Telemetry as of construction or the last refresh
    pub fn snapshot(&self) -> &VehicleSnapshot {
        &self.snapshot
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Re-read the energy report and replace the snapshot
    ///
    /// Fails with `VehicleNotFound` if the VIN is no longer on the account;
    /// the old snapshot is kept in that case.
    #[instrument(skip(self), fields(vin = %self.snapshot.vin))]
    pub async fn refresh(&mut self) -> Result<()> {
        let fresh = self
            .session
            .vehicle_snapshots()
            .await?
            .into_iter()
            .find(|s| s.vin == self.snapshot.vin)
            .ok_or_else(|| PrefectError::VehicleNotFound(self.snapshot.vin.clone()))?;

        debug!(odometer = fresh.odometer, "Snapshot refreshed");
        self.snapshot = fresh;
        Ok(())
    }

    /// Remote start
    pub async fn start_engine(&self) -> Result<Value> {
        self.send(LookupCode::Start).await
    }

    /// Cancel a remote start
    pub async fn cancel_start_engine(&self) -> Result<Value> {
        self.send(LookupCode::CancelStart).await
    }

    pub async fn lock(&self) -> Result<Value> {
        self.send(LookupCode::Lock).await
    }

    pub async fn unlock(&self) -> Result<Value> {
        self.send(LookupCode::Unlock).await
    }

    /// Select this vehicle and send an arbitrary lookup code
    pub async fn send(&self, code: LookupCode) -> Result<Value> {
        self.session.command_vehicle(self.vin(), &code).await
    }
}
