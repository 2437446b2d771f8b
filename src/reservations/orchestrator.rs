// Reservation orchestrator
//
// Entry point for create, amend and cancel. Each call resolves the property,
// routes it to one provider adapter, and writes exactly one operation log
// entry before returning.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use uuid::Uuid;
use validator::Validate;

use crate::inventory::{InventoryManager, StayRooms};
use crate::metrics::{OrchestrationMetrics, Outcome};
use crate::promotions::{PromoError, PromoTarget, PromoUsageTracker, UsageReversal};
use crate::properties::PropertyRegistry;
use crate::providers::{
    ProviderAdapter, ProviderAdapters, ProviderBody, ProviderRequest, ProviderResponse,
};
use crate::reservations::{
    route, AmendReservationInput, AttemptStatus, BookingDetails, CancelReservationInput,
    CanonicalReservation, ConsistencyError, OperationKind, OperationLogEntry, OrchestrationError,
    ReservationStatus, ReservationStore, Route, StatusMachine,
};
use crate::transform::legacy_xml::{self, LegacyAction};
use crate::transform::{
    canonicalize, modern_rest, parse_amended_stay, resolve_reservation_id, TransformError,
};

const COMPENSATION_REASON: &str = "Booking could not be completed locally";

/// Audit data collected while one attempt runs
struct Attempt {
    operation: OperationKind,
    reservation_id: String,
    property_id: Uuid,
    request_payload: Value,
    provider: Option<&'static str>,
    outgoing_payload: Option<Value>,
    provider_response: Option<Value>,
}

impl Attempt {
    fn new<T: Serialize>(
        operation: OperationKind,
        reservation_id: &str,
        property_id: Uuid,
        request: &T,
    ) -> Self {
        Self {
            operation,
            reservation_id: reservation_id.to_string(),
            property_id,
            request_payload: serde_json::to_value(request).unwrap_or(Value::Null),
            provider: None,
            outgoing_payload: None,
            provider_response: None,
        }
    }

    fn into_entry(self, status: AttemptStatus, error: Option<String>) -> OperationLogEntry {
        OperationLogEntry {
            id: Uuid::new_v4(),
            reservation_id: self.reservation_id,
            property_id: self.property_id,
            operation: self.operation,
            provider: self.provider.map(str::to_string),
            request_payload: self.request_payload,
            outgoing_payload: self.outgoing_payload,
            provider_response: self.provider_response,
            error,
            status,
            created_at: Utc::now(),
        }
    }
}

/// Routes reservation operations to the provider that owns each property
#[derive(Clone)]
pub struct ReservationOrchestrator {
    registry: PropertyRegistry,
    store: Arc<dyn ReservationStore>,
    adapters: ProviderAdapters,
    inventory: InventoryManager,
    promotions: PromoUsageTracker,
    metrics: OrchestrationMetrics,
    legacy_default_endpoint: Option<String>,
}

impl ReservationOrchestrator {
    pub fn new(
        registry: PropertyRegistry,
        store: Arc<dyn ReservationStore>,
        adapters: ProviderAdapters,
        inventory: InventoryManager,
        promotions: PromoUsageTracker,
        metrics: OrchestrationMetrics,
    ) -> Self {
        Self {
            registry,
            store,
            adapters,
            inventory,
            promotions,
            metrics,
            legacy_default_endpoint: None,
        }
    }

    /// Endpoint used for properties that have no data source
    pub fn with_legacy_default_endpoint(mut self, endpoint: Option<String>) -> Self {
        self.legacy_default_endpoint = endpoint;
        self
    }

    /// Create a reservation and return its id
    ///
    /// Once the input is valid the reservation is always persisted: Confirmed on
    /// success, Pending after a provider failure, Failed when inventory or the
    /// promo code could not be committed.
    pub async fn create_reservation(
        &self,
        property_id: Uuid,
        mut details: BookingDetails,
    ) -> Result<String, OrchestrationError> {
        details.reservation_id = resolve_reservation_id(&details.reservation_id);
        let mut attempt = Attempt::new(
            OperationKind::Reservation,
            &details.reservation_id,
            property_id,
            &details,
        );

        let result = self.run_create(&mut attempt, property_id, &details).await;
        self.finish(attempt, result).await
    }

    /// Move a confirmed reservation to new dates
    pub async fn amend_reservation(
        &self,
        input: AmendReservationInput,
    ) -> Result<String, OrchestrationError> {
        let mut attempt = Attempt::new(
            OperationKind::Amend,
            &input.reservation_id,
            input.property_id,
            &input,
        );

        let result = self.run_amend(&mut attempt, &input).await;
        self.finish(attempt, result).await
    }

    /// Cancel a reservation, returning its rooms and promo usage
    pub async fn cancel_reservation(
        &self,
        input: CancelReservationInput,
    ) -> Result<String, OrchestrationError> {
        let mut attempt = Attempt::new(
            OperationKind::Cancel,
            &input.reservation_id,
            input.property_id,
            &input,
        );

        let result = self.run_cancel(&mut attempt, &input).await;
        self.finish(attempt, result).await
    }

    async fn run_create(
        &self,
        attempt: &mut Attempt,
        property_id: Uuid,
        details: &BookingDetails,
    ) -> Result<String, OrchestrationError> {
        let config = self.registry.resolve(property_id).await?;
        let route = self.route_for(&config, attempt)?;
        let mut reservation = canonicalize(&config, details, Utc::now())?;

        if let Some(existing) = self.store.find_by_id(&reservation.reservation_id).await? {
            check_retry(&existing, property_id)?;
            reservation.created_at = existing.created_at;
        }
        if reservation.promo.is_some() && reservation.customer_key().is_none() {
            return Err(TransformError::single(
                "promoCode",
                "requires userId or email to track usage",
            )
            .into());
        }

        let body = create_body(&route, &reservation)?;
        attempt.outgoing_payload = body.to_audit_value();

        if let Err(err) = self.precheck(&reservation).await {
            if matches!(err, OrchestrationError::Consistency(_)) {
                reservation.status = ReservationStatus::Failed;
                self.persist_after_failure(&reservation).await;
            }
            return Err(err);
        }

        let request = provider_request(OperationKind::Reservation, &route, &reservation, body);
        let response = match self.call_provider(&route, &request, attempt).await {
            Ok(response) => response,
            Err(err) => {
                // stays Pending so the caller can retry with the same id
                self.persist_after_failure(&reservation).await;
                return Err(err);
            }
        };

        if let Err(err) = self.commit_side_effects(&reservation).await {
            let compensation = self.compensate(&route, &reservation, &response).await;
            attempt.provider_response = Some(json!({
                "response": response.raw,
                "compensation": compensation,
            }));
            reservation.status = ReservationStatus::Failed;
            reservation.updated_at = Utc::now();
            self.persist_after_failure(&reservation).await;
            return Err(err.into());
        }

        reservation.status =
            StatusMachine::transition(reservation.status, ReservationStatus::Confirmed)
                .map_err(OrchestrationError::InvalidTransition)?;
        reservation.external_id = response.external_id;
        reservation.updated_at = Utc::now();
        self.store.save(&reservation).await?;

        tracing::info!(
            %property_id,
            reservation_id = %reservation.reservation_id,
            provider = route.provider_name(),
            external_id = ?reservation.external_id,
            "Reservation confirmed"
        );
        Ok(reservation.reservation_id)
    }

    async fn run_amend(
        &self,
        attempt: &mut Attempt,
        input: &AmendReservationInput,
    ) -> Result<String, OrchestrationError> {
        input.validate().map_err(TransformError::from)?;
        let config = self.registry.resolve(input.property_id).await?;
        let route = self.route_for(&config, attempt)?;

        let mut reservation = self
            .load_for_change(input.property_id, &input.reservation_id)
            .await?;
        StatusMachine::can_amend(reservation.status)
            .map_err(OrchestrationError::InvalidTransition)?;

        let (check_in, check_out) =
            parse_amended_stay(&input.new_check_in_date, &input.new_check_out_date)?;
        if check_in < Utc::now().date_naive() {
            return Err(
                TransformError::single("newCheckInDate", "must not be in the past").into(),
            );
        }

        let body = amend_body(&route, &reservation, check_in, check_out)?;
        attempt.outgoing_payload = body.to_audit_value();
        let request = provider_request(OperationKind::Amend, &route, &reservation, body);
        self.call_provider(&route, &request, attempt).await?;

        reservation.check_in = check_in;
        reservation.check_out = check_out;
        reservation.updated_at = Utc::now();
        self.store.save(&reservation).await?;

        tracing::info!(
            property_id = %input.property_id,
            reservation_id = %reservation.reservation_id,
            provider = route.provider_name(),
            %check_in,
            %check_out,
            "Reservation amended"
        );
        Ok(reservation.reservation_id)
    }

    async fn run_cancel(
        &self,
        attempt: &mut Attempt,
        input: &CancelReservationInput,
    ) -> Result<String, OrchestrationError> {
        input.validate().map_err(TransformError::from)?;
        let config = self.registry.resolve(input.property_id).await?;
        let route = self.route_for(&config, attempt)?;

        let mut reservation = self
            .load_for_change(input.property_id, &input.reservation_id)
            .await?;
        StatusMachine::can_cancel(reservation.status)
            .map_err(OrchestrationError::InvalidTransition)?;

        let previous = reservation.status;
        // A booking the provider never confirmed has nothing to cancel remotely
        if previous == ReservationStatus::Confirmed || reservation.external_id.is_some() {
            let body = cancel_body(&route, &reservation, input.reason.as_deref())?;
            attempt.outgoing_payload = body.to_audit_value();
            let request = provider_request(OperationKind::Cancel, &route, &reservation, body);
            self.call_provider(&route, &request, attempt).await?;
        } else {
            attempt.provider_response = Some(json!({
                "status": "skipped",
                "reason": format!("reservation was {} locally", previous),
            }));
        }

        reservation.status =
            StatusMachine::transition(previous, ReservationStatus::Cancelled)
                .map_err(OrchestrationError::InvalidTransition)?;
        reservation.updated_at = Utc::now();
        self.store.save(&reservation).await?;

        if previous == ReservationStatus::Confirmed {
            self.release_after_cancel(&reservation, input.reason.clone())
                .await;
        }

        tracing::info!(
            property_id = %input.property_id,
            reservation_id = %reservation.reservation_id,
            provider = route.provider_name(),
            "Reservation cancelled"
        );
        Ok(reservation.reservation_id)
    }

    fn route_for(
        &self,
        config: &crate::properties::PmsConfig,
        attempt: &mut Attempt,
    ) -> Result<Route, OrchestrationError> {
        let route = route(config, self.legacy_default_endpoint.as_deref())?;
        attempt.provider = Some(route.provider_name());

        if let Route::LegacyXml {
            compatibility_default: true,
            ..
        } = route
        {
            tracing::debug!(
                property_id = %config.property_id,
                "Property has no data source, using legacy XML provider"
            );
        }
        Ok(route)
    }

    fn adapter_for(&self, route: &Route) -> &Arc<dyn ProviderAdapter> {
        match route {
            Route::Internal => &self.adapters.internal,
            Route::LegacyXml { .. } => &self.adapters.legacy_xml,
            Route::ModernRest { .. } => &self.adapters.modern_rest,
        }
    }

    /// Stored reservation for an amend or cancel, with the check-in precondition
    async fn load_for_change(
        &self,
        property_id: Uuid,
        reservation_id: &str,
    ) -> Result<CanonicalReservation, OrchestrationError> {
        let reservation = self
            .store
            .find_by_id(reservation_id)
            .await?
            .filter(|reservation| reservation.property_id == property_id)
            .ok_or_else(|| OrchestrationError::ReservationNotFound(reservation_id.to_string()))?;

        if Utc::now().date_naive() >= reservation.check_in {
            return Err(OrchestrationError::PastCheckIn {
                reservation_id: reservation.reservation_id,
                check_in: reservation.check_in,
            });
        }
        Ok(reservation)
    }

    async fn call_provider(
        &self,
        route: &Route,
        request: &ProviderRequest,
        attempt: &mut Attempt,
    ) -> Result<ProviderResponse, OrchestrationError> {
        let adapter = self.adapter_for(route);
        let timer = self.metrics.start_provider_call(adapter.name());
        let result = adapter.send(request).await;
        timer.finish(result.is_err());

        match result {
            Ok(response) => {
                attempt.provider_response = Some(response.raw.clone());
                Ok(response)
            }
            Err(source) => {
                tracing::warn!(
                    property_id = %attempt.property_id,
                    reservation_id = %attempt.reservation_id,
                    operation = %request.operation,
                    provider = adapter.name(),
                    error = %source,
                    "Provider call failed"
                );
                attempt.provider_response = Some(json!({
                    "error": source.to_string(),
                    "kind": source.kind(),
                }));
                Err(OrchestrationError::Provider {
                    property_id: attempt.property_id,
                    operation: request.operation,
                    provider: adapter.name().to_string(),
                    source,
                })
            }
        }
    }

    /// Read-only checks that keep an obviously unbookable stay away from the provider
    async fn precheck(&self, reservation: &CanonicalReservation) -> Result<(), OrchestrationError> {
        for stay in stays(reservation) {
            if self
                .inventory
                .is_tracked(&stay.hotel_code, &stay.room_type_code)
                .await
                .map_err(ConsistencyError::from)?
            {
                self.inventory
                    .check_availability(&stay)
                    .await
                    .map_err(ConsistencyError::from)?;
            }
        }

        if let (Some(promo), Some(customer)) = (&reservation.promo, reservation.customer_key()) {
            let expected = self
                .promotions
                .quote(promo.promo_id, customer, &promo_target(reservation))
                .await
                .map_err(ConsistencyError::from)?;
            if promo.discount_amount != expected {
                return Err(TransformError::single(
                    "promoCode.discountAmount",
                    format!("must be {} for this promo code", expected),
                )
                .into());
            }
        }
        Ok(())
    }

    /// Inventory and promo writes after the provider confirmed; all or nothing
    async fn commit_side_effects(
        &self,
        reservation: &CanonicalReservation,
    ) -> Result<(), ConsistencyError> {
        let mut reduced = Vec::new();
        let outcome = match self.reduce_inventory(reservation, &mut reduced).await {
            Ok(()) => self.apply_promo(reservation).await,
            Err(err) => Err(err),
        };

        if outcome.is_err() {
            self.release_stays(&reduced).await;
        }
        outcome
    }

    async fn reduce_inventory(
        &self,
        reservation: &CanonicalReservation,
        reduced: &mut Vec<StayRooms>,
    ) -> Result<(), ConsistencyError> {
        for stay in stays(reservation) {
            if self
                .inventory
                .is_tracked(&stay.hotel_code, &stay.room_type_code)
                .await?
            {
                self.inventory.reduce_rooms(&stay).await?;
                reduced.push(stay);
            }
        }
        Ok(())
    }

    async fn apply_promo(&self, reservation: &CanonicalReservation) -> Result<(), ConsistencyError> {
        let (promo, customer) = match (&reservation.promo, reservation.customer_key()) {
            (Some(promo), Some(customer)) => (promo, customer),
            _ => return Ok(()),
        };

        self.promotions
            .apply_usage(
                promo.promo_id,
                customer,
                &reservation.reservation_id,
                &promo_target(reservation),
            )
            .await?;
        Ok(())
    }

    async fn release_stays(&self, stays: &[StayRooms]) {
        for stay in stays {
            if let Err(err) = self.inventory.release_rooms(stay).await {
                tracing::error!(
                    hotel_code = %stay.hotel_code,
                    room_type_code = %stay.room_type_code,
                    error = %err,
                    "Failed to release inventory"
                );
            }
        }
    }

    async fn release_after_cancel(&self, reservation: &CanonicalReservation, reason: Option<String>) {
        let mut tracked = Vec::new();
        for stay in stays(reservation) {
            match self
                .inventory
                .is_tracked(&stay.hotel_code, &stay.room_type_code)
                .await
            {
                Ok(true) => tracked.push(stay),
                Ok(false) => {}
                Err(err) => tracing::error!(
                    reservation_id = %reservation.reservation_id,
                    error = %err,
                    "Failed to look up inventory for cancelled reservation"
                ),
            }
        }
        self.release_stays(&tracked).await;

        if reservation.promo.is_some() {
            match self
                .promotions
                .cancel_usage(&reservation.reservation_id, UsageReversal::Cancelled(reason))
                .await
            {
                Ok(_) => {}
                Err(PromoError::UsageNotFound(_)) => tracing::debug!(
                    reservation_id = %reservation.reservation_id,
                    "No applied promo usage to reverse"
                ),
                Err(err) => tracing::error!(
                    reservation_id = %reservation.reservation_id,
                    error = %err,
                    "Failed to reverse promo usage"
                ),
            }
        }
    }

    /// Best-effort cancel of a booking the provider confirmed but we could not keep
    async fn compensate(
        &self,
        route: &Route,
        reservation: &CanonicalReservation,
        response: &ProviderResponse,
    ) -> Value {
        if *route == Route::Internal {
            return json!({ "status": "skipped" });
        }

        let mut confirmed = reservation.clone();
        confirmed.external_id = response.external_id.clone();

        let adapter = self.adapter_for(route);
        let outcome = match cancel_body(route, &confirmed, Some(COMPENSATION_REASON)) {
            Ok(body) => {
                let request = provider_request(OperationKind::Cancel, route, &confirmed, body);
                let timer = self.metrics.start_provider_call(adapter.name());
                let result = adapter.send(&request).await;
                timer.finish(result.is_err());
                result.map(|response| response.raw).map_err(|e| e.to_string())
            }
            Err(err) => Err(err.to_string()),
        };

        match outcome {
            Ok(raw) => {
                tracing::warn!(
                    reservation_id = %reservation.reservation_id,
                    provider = adapter.name(),
                    "Provider booking cancelled after local failure"
                );
                json!({ "status": "sent", "response": raw })
            }
            Err(message) => {
                tracing::error!(
                    reservation_id = %reservation.reservation_id,
                    provider = adapter.name(),
                    error = %message,
                    "Compensating cancel failed, provider booking may be orphaned"
                );
                json!({ "status": "failed", "error": message })
            }
        }
    }

    async fn persist_after_failure(&self, reservation: &CanonicalReservation) {
        if let Err(err) = self.store.save(reservation).await {
            tracing::error!(
                reservation_id = %reservation.reservation_id,
                status = %reservation.status,
                error = %err,
                "Failed to persist reservation after failed attempt"
            );
        }
    }

    /// Write the attempt's log entry and record its outcome
    async fn finish<T>(
        &self,
        attempt: Attempt,
        result: Result<T, OrchestrationError>,
    ) -> Result<T, OrchestrationError> {
        let operation = attempt.operation;
        let (status, error) = match &result {
            Ok(_) => (AttemptStatus::Success, None),
            Err(err) => (err.attempt_status(), Some(err.to_string())),
        };
        self.metrics.record_outcome(
            operation,
            match status {
                AttemptStatus::Success => Outcome::Succeeded,
                AttemptStatus::Failed => Outcome::Failed,
                AttemptStatus::Rejected => Outcome::Rejected,
            },
        );

        let entry = attempt.into_entry(status, error);
        if let Err(store_err) = self.store.append_log(&entry).await {
            tracing::error!(
                reservation_id = %entry.reservation_id,
                %operation,
                error = %store_err,
                "Failed to append operation log entry"
            );
            if result.is_ok() {
                return Err(store_err.into());
            }
        }
        result
    }
}

/// Creating over an existing id is only a retry of an unfinished booking
fn check_retry(existing: &CanonicalReservation, property_id: Uuid) -> Result<(), OrchestrationError> {
    if existing.property_id != property_id {
        return Err(TransformError::single(
            "reservationId",
            "is already used by another property",
        )
        .into());
    }
    match existing.status {
        ReservationStatus::Confirmed => Err(OrchestrationError::AlreadyConfirmed(
            existing.reservation_id.clone(),
        )),
        status => StatusMachine::transition(status, ReservationStatus::Pending)
            .map(|_| ())
            .map_err(OrchestrationError::InvalidTransition),
    }
}

fn promo_target(reservation: &CanonicalReservation) -> PromoTarget {
    PromoTarget {
        lines: reservation
            .rooms
            .iter()
            .map(|line| (line.room_type_code.clone(), line.rate_plan_code.clone()))
            .collect(),
        amount: reservation.payment.total,
    }
}

fn stays(reservation: &CanonicalReservation) -> Vec<StayRooms> {
    reservation
        .rooms
        .iter()
        .map(|room| StayRooms {
            hotel_code: reservation.property_code.clone(),
            room_type_code: room.room_type_code.clone(),
            room_count: room.room_count,
            check_in: reservation.check_in,
            check_out: reservation.check_out,
        })
        .collect()
}

fn provider_request(
    operation: OperationKind,
    route: &Route,
    reservation: &CanonicalReservation,
    body: ProviderBody,
) -> ProviderRequest {
    ProviderRequest {
        operation,
        endpoint: route.endpoint().map(str::to_string),
        property_code: reservation.property_code.clone(),
        body,
    }
}

fn create_body(route: &Route, reservation: &CanonicalReservation) -> Result<ProviderBody, TransformError> {
    Ok(match route {
        Route::Internal => ProviderBody::Empty,
        Route::LegacyXml { .. } => ProviderBody::Xml(legacy_xml::to_envelope(
            LegacyAction::Create,
            &legacy_xml::create_fields(reservation)?,
        )?),
        Route::ModernRest { .. } => {
            ProviderBody::Json(serde_json::to_value(modern_rest::to_create(reservation)?)?)
        }
    })
}

fn amend_body(
    route: &Route,
    reservation: &CanonicalReservation,
    check_in: NaiveDate,
    check_out: NaiveDate,
) -> Result<ProviderBody, TransformError> {
    Ok(match route {
        Route::Internal => ProviderBody::Empty,
        Route::LegacyXml { .. } => ProviderBody::Xml(legacy_xml::to_envelope(
            LegacyAction::Modify,
            &legacy_xml::modify_fields(reservation, check_in, check_out),
        )?),
        Route::ModernRest { .. } => ProviderBody::Json(serde_json::to_value(
            modern_rest::to_amend(reservation, check_in, check_out),
        )?),
    })
}

fn cancel_body(
    route: &Route,
    reservation: &CanonicalReservation,
    reason: Option<&str>,
) -> Result<ProviderBody, TransformError> {
    Ok(match route {
        Route::Internal => ProviderBody::Empty,
        Route::LegacyXml { .. } => ProviderBody::Xml(legacy_xml::to_envelope(
            LegacyAction::Cancel,
            &legacy_xml::cancel_fields(reservation, reason),
        )?),
        Route::ModernRest { .. } => {
            ProviderBody::Json(serde_json::to_value(modern_rest::to_cancel(reservation))?)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::Duration;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    use crate::inventory::{InMemoryInventoryRepository, InventoryError, InventoryRecord, InventoryRepository};
    use crate::promotions::{
        DiscountType, InMemoryPromoRepository, PromoCode, PromoRepository, UsageStatus,
    };
    use crate::properties::{
        DataSource, ExternalPmsConfig, InMemoryPropertyRepository, Property, PropertyRepository,
    };
    use crate::providers::ProviderError;
    use crate::reservations::{
        AgeCodeSummary, GuestInput, InMemoryReservationStore, PromoInput, RoutingError,
    };

    /// Adapter double that records every request it receives
    struct RecordingAdapter {
        name: &'static str,
        external_id: Option<String>,
        failure: Option<(OperationKind, ProviderError)>,
        /// Rooms taken by a competing booking while the create call is in flight
        competing_booking: Option<(Arc<InMemoryInventoryRepository>, Vec<InventoryRecord>)>,
        calls: Mutex<Vec<ProviderRequest>>,
    }

    impl RecordingAdapter {
        fn new(name: &'static str) -> Self {
            Self {
                name,
                external_id: None,
                failure: None,
                competing_booking: None,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn with_external_id(mut self, id: &str) -> Self {
            self.external_id = Some(id.to_string());
            self
        }

        fn failing(mut self, operation: OperationKind, error: ProviderError) -> Self {
            self.failure = Some((operation, error));
            self
        }

        fn calls(&self) -> Vec<ProviderRequest> {
            self.calls.lock().unwrap().clone()
        }

        fn operations(&self) -> Vec<OperationKind> {
            self.calls().iter().map(|call| call.operation).collect()
        }
    }

    #[async_trait]
    impl ProviderAdapter for RecordingAdapter {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn send(&self, request: &ProviderRequest) -> Result<ProviderResponse, ProviderError> {
            self.calls.lock().unwrap().push(request.clone());

            if let Some((operation, error)) = &self.failure {
                if *operation == request.operation {
                    return Err(error.clone());
                }
            }
            if request.operation == OperationKind::Reservation {
                if let Some((repository, records)) = &self.competing_booking {
                    for record in records {
                        repository.upsert(record).await.unwrap();
                    }
                }
            }

            Ok(ProviderResponse {
                external_id: match request.operation {
                    OperationKind::Reservation => self.external_id.clone(),
                    _ => None,
                },
                raw: json!({ "ok": true, "operation": request.operation.as_str() }),
            })
        }
    }

    struct Harness {
        orchestrator: ReservationOrchestrator,
        store: Arc<InMemoryReservationStore>,
        properties: Arc<InMemoryPropertyRepository>,
        inventory: Arc<InMemoryInventoryRepository>,
        promos: Arc<InMemoryPromoRepository>,
        internal: Arc<RecordingAdapter>,
        legacy: Arc<RecordingAdapter>,
        modern: Arc<RecordingAdapter>,
        metrics: OrchestrationMetrics,
    }

    impl Harness {
        fn new() -> Self {
            Self::with_adapters(
                RecordingAdapter::new("LegacyXML").with_external_id("LX-1"),
                RecordingAdapter::new("ModernREST").with_external_id("MR-1"),
                Arc::new(InMemoryInventoryRepository::new()),
            )
        }

        fn with_adapters(
            legacy: RecordingAdapter,
            modern: RecordingAdapter,
            inventory: Arc<InMemoryInventoryRepository>,
        ) -> Self {
            let store = Arc::new(InMemoryReservationStore::new());
            let properties = Arc::new(InMemoryPropertyRepository::new());
            let promos = Arc::new(InMemoryPromoRepository::new());
            let internal = Arc::new(RecordingAdapter::new("internal"));
            let legacy = Arc::new(legacy);
            let modern = Arc::new(modern);
            let metrics = OrchestrationMetrics::new();

            let adapters = ProviderAdapters {
                internal: internal.clone(),
                legacy_xml: legacy.clone(),
                modern_rest: modern.clone(),
            };
            let orchestrator = ReservationOrchestrator::new(
                PropertyRegistry::new(properties.clone()),
                store.clone(),
                adapters,
                InventoryManager::new(inventory.clone()),
                PromoUsageTracker::new(promos.clone()),
                metrics.clone(),
            )
            .with_legacy_default_endpoint(Some("https://legacy.example.com/xml".to_string()));

            Self {
                orchestrator,
                store,
                properties,
                inventory,
                promos,
                internal,
                legacy,
                modern,
                metrics,
            }
        }

        async fn property(&self, data_source: Option<DataSource>) -> Uuid {
            let property = Property {
                id: Uuid::new_v4(),
                code: "HTL001".to_string(),
                name: "Harbour View".to_string(),
                data_source,
            };
            self.properties.upsert(&property).await.unwrap();
            property.id
        }

        fn adapter_calls(&self) -> usize {
            self.internal.calls().len() + self.legacy.calls().len() + self.modern.calls().len()
        }

        async fn logs(&self, reservation_id: &str) -> Vec<OperationLogEntry> {
            self.store.logs_for_reservation(reservation_id).await.unwrap()
        }

        async fn stored(&self, reservation_id: &str) -> Option<CanonicalReservation> {
            self.store.find_by_id(reservation_id).await.unwrap()
        }

        async fn seed_nights(&self, room_type_code: &str, counts: &[i32]) {
            for (offset, count) in counts.iter().enumerate() {
                self.inventory
                    .upsert(&InventoryRecord {
                        hotel_code: "HTL001".to_string(),
                        room_type_code: room_type_code.to_string(),
                        date: day(30 + offset as i64),
                        count: *count,
                    })
                    .await
                    .unwrap();
            }
        }

        async fn counts(&self, room_type_code: &str, nights: i64) -> Vec<i32> {
            self.inventory
                .find_range("HTL001", room_type_code, day(30), day(30 + nights))
                .await
                .unwrap()
                .into_iter()
                .map(|record| record.count)
                .collect()
        }
    }

    fn day(offset: i64) -> NaiveDate {
        Utc::now().date_naive() + Duration::days(offset)
    }

    fn modern_source() -> Option<DataSource> {
        Some(DataSource::ExternalPms(ExternalPmsConfig {
            provider: "ModernREST".to_string(),
            api_endpoint: Some("https://pms.example.com/bookings/".to_string()),
            is_active: true,
        }))
    }

    fn details(reservation_id: &str, rooms: i32) -> BookingDetails {
        BookingDetails {
            check_in_date: day(30).to_string(),
            check_out_date: day(33).to_string(),
            reservation_id: reservation_id.to_string(),
            user_id: Some("cust-1".to_string()),
            hotel_code: "HTL001".to_string(),
            rate_plan_code: "BAR".to_string(),
            room_type_code: "DBL".to_string(),
            number_of_rooms: rooms,
            room_total_price: dec!(450.00),
            currency_code: "USD".to_string(),
            payment_method: "card".to_string(),
            email: Some("ada@example.com".to_string()),
            guests: vec![GuestInput {
                first_name: "Ada".to_string(),
                last_name: "Lovelace".to_string(),
                user_type: "adult".to_string(),
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    fn promo(use_limit: i32, current_usage: i32) -> PromoCode {
        PromoCode {
            id: Uuid::new_v4(),
            code: "WINTER".to_string(),
            discount_type: DiscountType::Flat,
            value: dec!(50),
            valid_from: None,
            valid_until: None,
            use_limit,
            usage_limit_per_user: 1,
            applicable_room_types: vec![],
            applicable_rate_plans: vec![],
            current_usage,
            used_by: vec![],
            is_active: true,
        }
    }

    #[tokio::test]
    async fn test_internal_create_confirms_without_external_id() {
        let harness = Harness::new();
        let property_id = harness.property(Some(DataSource::Internal)).await;

        let id = harness
            .orchestrator
            .create_reservation(property_id, details("", 1))
            .await
            .unwrap();

        assert!(id.starts_with("RES-"));
        let stored = harness.stored(&id).await.unwrap();
        assert_eq!(stored.status, ReservationStatus::Confirmed);
        assert!(stored.external_id.is_none());
        assert_eq!(harness.internal.calls().len(), 1);

        let logs = harness.logs(&id).await;
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].operation, OperationKind::Reservation);
        assert_eq!(logs[0].status, AttemptStatus::Success);
        assert_eq!(logs[0].provider.as_deref(), Some("internal"));
        assert_eq!(harness.metrics.snapshot().reservations.succeeded, 1);
    }

    #[tokio::test]
    async fn test_modern_rest_create_records_external_id() {
        let harness = Harness::new();
        let property_id = harness.property(modern_source()).await;

        let id = harness
            .orchestrator
            .create_reservation(property_id, details("BK-1", 1))
            .await
            .unwrap();

        assert_eq!(id, "BK-1");
        let stored = harness.stored("BK-1").await.unwrap();
        assert_eq!(stored.status, ReservationStatus::Confirmed);
        assert_eq!(stored.external_id.as_deref(), Some("MR-1"));

        let calls = harness.modern.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].endpoint.as_deref(), Some("https://pms.example.com/bookings/"));
        match &calls[0].body {
            ProviderBody::Json(body) => assert_eq!(body["from"], day(30).to_string()),
            other => panic!("unexpected body {:?}", other),
        }

        let logs = harness.logs("BK-1").await;
        assert_eq!(logs.len(), 1);
        assert!(logs[0].outgoing_payload.is_some());
        assert_eq!(logs[0].provider_response.as_ref().unwrap()["ok"], true);
    }

    #[tokio::test]
    async fn test_property_without_data_source_uses_legacy_xml() {
        let harness = Harness::new();
        let property_id = harness.property(None).await;

        harness
            .orchestrator
            .create_reservation(property_id, details("BK-2", 1))
            .await
            .unwrap();

        let calls = harness.legacy.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].endpoint.as_deref(), Some("https://legacy.example.com/xml"));
        assert!(matches!(&calls[0].body, ProviderBody::Xml(xml) if xml.contains("Action=\"Create\"")));
        assert_eq!(
            harness.stored("BK-2").await.unwrap().external_id.as_deref(),
            Some("LX-1")
        );
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn test_any_property_without_data_source_routes_to_legacy(rooms in 1i32..5, nights in 1i64..6) {
            let runtime = tokio::runtime::Runtime::new().unwrap();
            runtime.block_on(async {
                let harness = Harness::new();
                let property_id = harness.property(None).await;
                let mut input = details("", rooms);
                input.check_out_date = day(30 + nights).to_string();

                harness.orchestrator.create_reservation(property_id, input).await.unwrap();

                assert_eq!(harness.legacy.operations(), vec![OperationKind::Reservation]);
                assert!(harness.modern.calls().is_empty());
                assert!(harness.internal.calls().is_empty());
            });
        }
    }

    #[tokio::test]
    async fn test_channel_manager_is_not_implemented() {
        let harness = Harness::new();
        let property_id = harness
            .property(Some(DataSource::ChannelManager { provider: None }))
            .await;

        let create = harness
            .orchestrator
            .create_reservation(property_id, details("BK-3", 1))
            .await;
        let cancel = harness
            .orchestrator
            .cancel_reservation(CancelReservationInput {
                property_id,
                reservation_id: "BK-3".to_string(),
                reason: None,
            })
            .await;

        for result in [create, cancel] {
            assert!(matches!(
                result,
                Err(OrchestrationError::Routing(RoutingError::NotImplemented(_)))
            ));
        }
        assert_eq!(harness.adapter_calls(), 0);
        assert!(harness.stored("BK-3").await.is_none());

        let logs = harness.logs("BK-3").await;
        assert_eq!(logs.len(), 2);
        assert!(logs.iter().all(|log| log.status == AttemptStatus::Rejected));
    }

    #[tokio::test]
    async fn test_unknown_property_is_logged() {
        let harness = Harness::new();
        let missing = Uuid::new_v4();

        let err = harness
            .orchestrator
            .create_reservation(missing, details("BK-4", 1))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            OrchestrationError::Routing(RoutingError::PropertyNotFound(id)) if id == missing
        ));
        let logs = harness.logs("BK-4").await;
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].property_id, missing);
    }

    #[tokio::test]
    async fn test_validation_failure_is_logged_but_not_persisted() {
        let harness = Harness::new();
        let property_id = harness.property(Some(DataSource::Internal)).await;
        let mut input = details("BK-5", 1);
        input.guests.clear();
        input.check_out_date = input.check_in_date.clone();

        let err = harness
            .orchestrator
            .create_reservation(property_id, input)
            .await
            .unwrap_err();

        match &err {
            OrchestrationError::Validation(inner) => {
                let fields: Vec<_> = inner.violations().iter().map(|v| v.field.as_str()).collect();
                assert!(fields.contains(&"guests"));
                assert!(fields.contains(&"checkOutDate"));
            }
            other => panic!("unexpected error {:?}", other),
        }
        assert_eq!(harness.adapter_calls(), 0);
        assert!(harness.stored("BK-5").await.is_none());
        let logs = harness.logs("BK-5").await;
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].status, AttemptStatus::Rejected);
        assert!(logs[0].error.as_deref().unwrap().contains("guests"));
    }

    #[tokio::test]
    async fn test_provider_failure_persists_pending_and_allows_retry() {
        let harness = Harness::with_adapters(
            RecordingAdapter::new("LegacyXML"),
            RecordingAdapter::new("ModernREST").failing(
                OperationKind::Reservation,
                ProviderError::NoResponse("timed out".to_string()),
            ),
            Arc::new(InMemoryInventoryRepository::new()),
        );
        let property_id = harness.property(modern_source()).await;

        let err = harness
            .orchestrator
            .create_reservation(property_id, details("BK-6", 1))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            OrchestrationError::Provider {
                operation: OperationKind::Reservation,
                source: ProviderError::NoResponse(_),
                ..
            }
        ));

        let stored = harness.stored("BK-6").await.unwrap();
        assert_eq!(stored.status, ReservationStatus::Pending);
        assert!(stored.external_id.is_none());

        let logs = harness.logs("BK-6").await;
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].status, AttemptStatus::Failed);
        assert_eq!(
            logs[0].provider_response.as_ref().unwrap()["kind"],
            "PROVIDER_NO_RESPONSE"
        );
        assert_eq!(harness.metrics.snapshot().provider_failures, 1);
    }

    #[tokio::test]
    async fn test_create_retry_rules() {
        let harness = Harness::new();
        let property_id = harness.property(Some(DataSource::Internal)).await;

        harness
            .orchestrator
            .create_reservation(property_id, details("BK-7", 1))
            .await
            .unwrap();

        // Confirmed bookings cannot be created again
        let err = harness
            .orchestrator
            .create_reservation(property_id, details("BK-7", 1))
            .await
            .unwrap_err();
        assert!(matches!(err, OrchestrationError::AlreadyConfirmed(id) if id == "BK-7"));

        // A failed booking can be retried under the same id
        let mut failed = harness.stored("BK-7").await.unwrap();
        failed.reservation_id = "BK-8".to_string();
        failed.status = ReservationStatus::Failed;
        harness.store.save(&failed).await.unwrap();
        harness
            .orchestrator
            .create_reservation(property_id, details("BK-8", 1))
            .await
            .unwrap();
        let retried = harness.stored("BK-8").await.unwrap();
        assert_eq!(retried.status, ReservationStatus::Confirmed);
        assert_eq!(retried.created_at, failed.created_at);

        assert_eq!(harness.logs("BK-7").await.len(), 2);
    }

    #[tokio::test]
    async fn test_insufficient_inventory_never_reaches_provider() {
        let harness = Harness::new();
        let property_id = harness.property(modern_source()).await;
        harness.seed_nights("DBL", &[5, 5, 5]).await;

        let err = harness
            .orchestrator
            .create_reservation(property_id, details("BK-9", 6))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            OrchestrationError::Consistency(ConsistencyError::Inventory(
                InventoryError::InsufficientAvailability { requested: 6, available: 5, .. }
            ))
        ));
        assert_eq!(harness.adapter_calls(), 0);
        assert_eq!(harness.counts("DBL", 3).await, vec![5, 5, 5]);
        assert_eq!(
            harness.stored("BK-9").await.unwrap().status,
            ReservationStatus::Failed
        );
    }

    #[tokio::test]
    async fn test_confirmed_create_reduces_inventory() {
        let harness = Harness::new();
        let property_id = harness.property(modern_source()).await;
        harness.seed_nights("DBL", &[5, 5, 5]).await;

        harness
            .orchestrator
            .create_reservation(property_id, details("BK-10", 2))
            .await
            .unwrap();

        assert_eq!(harness.counts("DBL", 3).await, vec![3, 3, 3]);
    }

    #[tokio::test]
    async fn test_lost_inventory_race_cancels_provider_booking() {
        let inventory = Arc::new(InMemoryInventoryRepository::new());
        let mut modern = RecordingAdapter::new("ModernREST").with_external_id("MR-77");
        modern.competing_booking = Some((
            inventory.clone(),
            vec![InventoryRecord {
                hotel_code: "HTL001".to_string(),
                room_type_code: "DBL".to_string(),
                date: day(31),
                count: 0,
            }],
        ));
        let harness = Harness::with_adapters(RecordingAdapter::new("LegacyXML"), modern, inventory);
        let property_id = harness.property(modern_source()).await;
        harness.seed_nights("DBL", &[2, 2, 2]).await;

        let err = harness
            .orchestrator
            .create_reservation(property_id, details("BK-11", 1))
            .await
            .unwrap_err();

        assert!(matches!(err, OrchestrationError::Consistency(_)));
        assert_eq!(harness.counts("DBL", 3).await, vec![2, 0, 2]);
        assert_eq!(
            harness.modern.operations(),
            vec![OperationKind::Reservation, OperationKind::Cancel]
        );
        match &harness.modern.calls()[1].body {
            ProviderBody::Json(body) => assert_eq!(body["bookingCode"], "MR-77"),
            other => panic!("unexpected body {:?}", other),
        }

        let stored = harness.stored("BK-11").await.unwrap();
        assert_eq!(stored.status, ReservationStatus::Failed);
        assert!(stored.external_id.is_none());

        let logs = harness.logs("BK-11").await;
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].status, AttemptStatus::Failed);
        assert_eq!(
            logs[0].provider_response.as_ref().unwrap()["compensation"]["status"],
            "sent"
        );
    }

    #[tokio::test]
    async fn test_promo_is_applied_and_reversed_on_cancel() {
        let harness = Harness::new();
        let property_id = harness.property(Some(DataSource::Internal)).await;
        harness.seed_nights("DBL", &[4, 4, 4]).await;
        let code = promo(10, 0);
        harness.promos.upsert(&code).await.unwrap();

        let mut input = details("BK-12", 1);
        input.promo_code = Some(PromoInput {
            promo_id: code.id,
            discount_amount: dec!(50),
        });
        harness
            .orchestrator
            .create_reservation(property_id, input)
            .await
            .unwrap();

        let stored = harness.stored("BK-12").await.unwrap();
        assert_eq!(stored.payment.discount, dec!(50));
        assert_eq!(
            harness.promos.find_by_id(code.id).await.unwrap().unwrap().current_usage,
            1
        );
        assert_eq!(harness.counts("DBL", 3).await, vec![3, 3, 3]);

        harness
            .orchestrator
            .cancel_reservation(CancelReservationInput {
                property_id,
                reservation_id: "BK-12".to_string(),
                reason: Some("change of plans".to_string()),
            })
            .await
            .unwrap();

        assert_eq!(
            harness.stored("BK-12").await.unwrap().status,
            ReservationStatus::Cancelled
        );
        assert_eq!(harness.counts("DBL", 3).await, vec![4, 4, 4]);
        let promo_after = harness.promos.find_by_id(code.id).await.unwrap().unwrap();
        assert_eq!(promo_after.current_usage, 0);
        let usages = harness.promos.usages_for_booking("BK-12").await.unwrap();
        assert_eq!(usages[0].status, UsageStatus::Cancelled);
        assert_eq!(usages[0].cancel_reason.as_deref(), Some("change of plans"));
    }

    #[tokio::test]
    async fn test_exhausted_promo_is_refused_before_provider() {
        let harness = Harness::new();
        let property_id = harness.property(modern_source()).await;
        let code = promo(3, 3);
        harness.promos.upsert(&code).await.unwrap();

        let mut input = details("BK-13", 1);
        input.promo_code = Some(PromoInput {
            promo_id: code.id,
            discount_amount: dec!(50),
        });
        let err = harness
            .orchestrator
            .create_reservation(property_id, input)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            OrchestrationError::Consistency(ConsistencyError::Promo(PromoError::NotUsable(_)))
        ));
        assert_eq!(harness.adapter_calls(), 0);
    }

    #[tokio::test]
    async fn test_promo_for_other_room_type_is_refused_before_provider() {
        let harness = Harness::new();
        let property_id = harness.property(modern_source()).await;
        let mut code = promo(10, 0);
        code.applicable_room_types = vec!["STE".to_string()];
        code.applicable_rate_plans = vec!["MEMBER".to_string()];
        harness.promos.upsert(&code).await.unwrap();

        let mut input = details("BK-31", 1);
        input.promo_code = Some(PromoInput {
            promo_id: code.id,
            discount_amount: dec!(50),
        });
        let err = harness
            .orchestrator
            .create_reservation(property_id, input)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            OrchestrationError::Consistency(ConsistencyError::Promo(PromoError::NotUsable(_)))
        ));
        assert_eq!(harness.adapter_calls(), 0);
        assert_eq!(
            harness.promos.find_by_id(code.id).await.unwrap().unwrap().current_usage,
            0
        );
        assert!(harness.promos.usages_for_booking("BK-31").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_inflated_promo_discount_is_rejected() {
        let harness = Harness::new();
        let property_id = harness.property(modern_source()).await;
        let code = promo(10, 0);
        harness.promos.upsert(&code).await.unwrap();

        let mut input = details("BK-32", 1);
        input.promo_code = Some(PromoInput {
            promo_id: code.id,
            discount_amount: dec!(449),
        });
        let err = harness
            .orchestrator
            .create_reservation(property_id, input)
            .await
            .unwrap_err();

        match err {
            OrchestrationError::Validation(err) => {
                assert_eq!(err.violations()[0].field, "promoCode.discountAmount");
                assert!(err.violations()[0].message.contains("50"));
            }
            other => panic!("expected a validation error, got {:?}", other),
        }
        assert_eq!(harness.adapter_calls(), 0);
        assert!(harness.stored("BK-32").await.is_none());
        assert_eq!(
            harness.promos.find_by_id(code.id).await.unwrap().unwrap().current_usage,
            0
        );
        assert!(harness.promos.usages_for_booking("BK-32").await.unwrap().is_empty());
        assert_eq!(harness.logs("BK-32").await.len(), 1);
    }

    #[tokio::test]
    async fn test_age_code_summary_is_checked_and_logged() {
        let harness = Harness::new();
        let property_id = harness.property(modern_source()).await;

        let mut wrong = details("BK-33", 1);
        wrong.age_code_summary = Some(AgeCodeSummary { adult: 2, child: 0, infant: 0 });
        let err = harness
            .orchestrator
            .create_reservation(property_id, wrong)
            .await
            .unwrap_err();
        assert!(matches!(err, OrchestrationError::Validation(_)));
        assert_eq!(harness.adapter_calls(), 0);

        let mut input = details("BK-33", 1);
        input.age_code_summary = Some(AgeCodeSummary { adult: 1, child: 0, infant: 0 });
        harness
            .orchestrator
            .create_reservation(property_id, input)
            .await
            .unwrap();

        let logs = harness.logs("BK-33").await;
        assert_eq!(logs.len(), 2);
        assert_eq!(
            logs[1].request_payload["ageCodeSummary"],
            json!({"adult": 1, "child": 0, "infant": 0})
        );
    }

    #[tokio::test]
    async fn test_amend_and_cancel_on_check_in_day_are_refused() {
        let harness = Harness::new();
        let property_id = harness.property(modern_source()).await;
        harness
            .orchestrator
            .create_reservation(property_id, details("BK-14", 1))
            .await
            .unwrap();

        let mut stored = harness.stored("BK-14").await.unwrap();
        stored.check_in = Utc::now().date_naive();
        stored.check_out = day(2);
        harness.store.save(&stored).await.unwrap();
        let calls_before = harness.adapter_calls();

        let amend = harness
            .orchestrator
            .amend_reservation(AmendReservationInput {
                property_id,
                reservation_id: "BK-14".to_string(),
                new_check_in_date: day(40).to_string(),
                new_check_out_date: day(42).to_string(),
            })
            .await;
        let cancel = harness
            .orchestrator
            .cancel_reservation(CancelReservationInput {
                property_id,
                reservation_id: "BK-14".to_string(),
                reason: None,
            })
            .await;

        assert!(matches!(amend, Err(OrchestrationError::PastCheckIn { .. })));
        assert!(matches!(cancel, Err(OrchestrationError::PastCheckIn { .. })));
        assert_eq!(harness.adapter_calls(), calls_before);

        let logs = harness.logs("BK-14").await;
        let kinds: Vec<_> = logs.iter().map(|log| log.operation).collect();
        assert_eq!(
            kinds,
            vec![OperationKind::Reservation, OperationKind::Amend, OperationKind::Cancel]
        );
    }

    #[tokio::test]
    async fn test_amend_updates_dates_through_provider() {
        let harness = Harness::new();
        let property_id = harness.property(modern_source()).await;
        harness
            .orchestrator
            .create_reservation(property_id, details("BK-15", 1))
            .await
            .unwrap();

        harness
            .orchestrator
            .amend_reservation(AmendReservationInput {
                property_id,
                reservation_id: "BK-15".to_string(),
                new_check_in_date: day(40).to_string(),
                new_check_out_date: day(42).to_string(),
            })
            .await
            .unwrap();

        let stored = harness.stored("BK-15").await.unwrap();
        assert_eq!((stored.check_in, stored.check_out), (day(40), day(42)));

        let amend_call = &harness.modern.calls()[1];
        assert_eq!(amend_call.operation, OperationKind::Amend);
        match &amend_call.body {
            ProviderBody::Json(body) => {
                assert_eq!(body["bookingCode"], "MR-1");
                assert_eq!(body["newFromDate"], day(40).to_string());
            }
            other => panic!("unexpected body {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_amend_rejects_bad_ranges_and_missing_reservations() {
        let harness = Harness::new();
        let property_id = harness.property(Some(DataSource::Internal)).await;
        harness
            .orchestrator
            .create_reservation(property_id, details("BK-16", 1))
            .await
            .unwrap();

        let reversed = harness
            .orchestrator
            .amend_reservation(AmendReservationInput {
                property_id,
                reservation_id: "BK-16".to_string(),
                new_check_in_date: day(42).to_string(),
                new_check_out_date: day(40).to_string(),
            })
            .await;
        assert!(matches!(reversed, Err(OrchestrationError::Validation(_))));

        let missing = harness
            .orchestrator
            .amend_reservation(AmendReservationInput {
                property_id,
                reservation_id: "NOPE".to_string(),
                new_check_in_date: day(40).to_string(),
                new_check_out_date: day(42).to_string(),
            })
            .await;
        assert!(matches!(missing, Err(OrchestrationError::ReservationNotFound(id)) if id == "NOPE"));
        assert_eq!(harness.logs("NOPE").await.len(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_reservation_cannot_change_again() {
        let harness = Harness::new();
        let property_id = harness.property(Some(DataSource::Internal)).await;
        harness
            .orchestrator
            .create_reservation(property_id, details("BK-17", 1))
            .await
            .unwrap();
        let cancel = CancelReservationInput {
            property_id,
            reservation_id: "BK-17".to_string(),
            reason: None,
        };
        harness
            .orchestrator
            .cancel_reservation(cancel.clone())
            .await
            .unwrap();

        let again = harness.orchestrator.cancel_reservation(cancel).await;
        assert!(matches!(again, Err(OrchestrationError::InvalidTransition(_))));

        let amend = harness
            .orchestrator
            .amend_reservation(AmendReservationInput {
                property_id,
                reservation_id: "BK-17".to_string(),
                new_check_in_date: day(40).to_string(),
                new_check_out_date: day(42).to_string(),
            })
            .await;
        assert!(matches!(amend, Err(OrchestrationError::InvalidTransition(_))));
        assert_eq!(harness.internal.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_cancel_of_pending_reservation_skips_provider() {
        let harness = Harness::with_adapters(
            RecordingAdapter::new("LegacyXML"),
            RecordingAdapter::new("ModernREST").failing(
                OperationKind::Reservation,
                ProviderError::Status {
                    status: 503,
                    body: "maintenance".to_string(),
                },
            ),
            Arc::new(InMemoryInventoryRepository::new()),
        );
        let property_id = harness.property(modern_source()).await;
        let _ = harness
            .orchestrator
            .create_reservation(property_id, details("BK-18", 1))
            .await;

        harness
            .orchestrator
            .cancel_reservation(CancelReservationInput {
                property_id,
                reservation_id: "BK-18".to_string(),
                reason: None,
            })
            .await
            .unwrap();

        assert_eq!(harness.modern.operations(), vec![OperationKind::Reservation]);
        assert_eq!(
            harness.stored("BK-18").await.unwrap().status,
            ReservationStatus::Cancelled
        );
        let logs = harness.logs("BK-18").await;
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[1].status, AttemptStatus::Success);
    }
}
