// libs/payment-cell/src/services/reconciliation.rs
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

use appointment_cell::models::{Appointment, PaymentMark};
use appointment_cell::services::AppointmentLifecycleService;
use shared_models::auth::Principal;

use crate::models::{
    Confidence, OrderHandle, OrderRequest, PaymentConfirmation, PaymentError, ProviderKind,
    ReconciliationPolicy,
};
use crate::services::provider::{minor_units, ProviderRegistry};
use crate::services::stripe::confirmation_from_event;

/// Turns provider confirmations into `paid = true` on appointments.
pub struct PaymentReconciliationService {
    lifecycle: AppointmentLifecycleService,
    providers: Arc<ProviderRegistry>,
    policy: ReconciliationPolicy,
    currency: String,
}

fn is_owner(principal: &Principal, appointment: &Appointment) -> bool {
    principal.is_admin() || principal.id == appointment.patient_id
}

impl PaymentReconciliationService {
    pub fn new(
        lifecycle: AppointmentLifecycleService,
        providers: Arc<ProviderRegistry>,
        policy: ReconciliationPolicy,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            lifecycle,
            providers,
            policy,
            currency: currency.into(),
        }
    }

    /// Open a checkout for the appointment's fee.
    pub async fn create_order(
        &self,
        principal: &Principal,
        kind: ProviderKind,
        appointment_id: Uuid,
        return_origin: &str,
    ) -> Result<OrderHandle, PaymentError> {
        let provider = self.providers.get(kind)?;
        let appointment = self.lifecycle.load(appointment_id).await?;

        if !is_owner(principal, &appointment) {
            return Err(PaymentError::Forbidden);
        }
        if appointment.cancelled {
            return Err(PaymentError::AppointmentCancelled);
        }
        if appointment.paid {
            return Err(PaymentError::AlreadyPaid);
        }

        let request = OrderRequest {
            appointment_id,
            amount_minor: minor_units(appointment.amount),
            currency: self.currency.clone(),
            return_origin: return_origin.to_string(),
        };

        let order = provider.create_order(&request).await?;
        info!("Opened {} order {} for appointment {}", kind, order.order_id, appointment_id);

        Ok(order)
    }

    /// Verify the client's post-checkout payload and mark the appointment
    /// paid. Repeating a successful verification is harmless.
    pub async fn verify(
        &self,
        principal: &Principal,
        kind: ProviderKind,
        payload: &Value,
    ) -> Result<PaymentMark, PaymentError> {
        let provider = self.providers.get(kind)?;
        let confirmation = provider.verify(payload).await?;

        if confirmation.confidence == Confidence::RedirectTrusted {
            if !self.policy.accept_redirect_confirmations {
                warn!("Rejecting redirect confirmation for {}", confirmation.appointment_id);
                return Err(PaymentError::UnverifiedConfirmation);
            }

            let appointment = self.lifecycle.load(confirmation.appointment_id).await?;
            if !is_owner(principal, &appointment) {
                warn!(
                    "{} tried to confirm appointment {} they do not own",
                    principal.id, confirmation.appointment_id
                );
                return Err(PaymentError::UnverifiedConfirmation);
            }
        }

        self.settle(&confirmation).await
    }

    /// Stripe webhook delivery. Returns `None` for events that confirm
    /// nothing, and for confirmations that can no longer be applied.
    pub async fn handle_stripe_webhook(
        &self,
        signature_header: &str,
        body: &[u8],
        now: i64,
    ) -> Result<Option<PaymentMark>, PaymentError> {
        let verifier = self.providers.stripe_webhook()?;
        let event = verifier.verify(signature_header, body, now)?;

        let Some(confirmation) = confirmation_from_event(&event) else {
            debug!("Ignoring Stripe event {} ({})", event.id, event.event_type);
            return Ok(None);
        };

        match self.settle(&confirmation).await {
            Ok(mark) => Ok(Some(mark)),
            // Stripe retries non-2xx deliveries; these will never succeed.
            Err(err @ (PaymentError::AppointmentCancelled | PaymentError::AppointmentNotFound)) => {
                warn!(
                    "Stripe event {} for appointment {} not applied: {}",
                    event.id, confirmation.appointment_id, err
                );
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    async fn settle(&self, confirmation: &PaymentConfirmation) -> Result<PaymentMark, PaymentError> {
        let mark = self.lifecycle.mark_paid(confirmation.appointment_id).await?;

        match &mark {
            PaymentMark::Marked(_) => info!(
                "Appointment {} paid ({:?}, ref {})",
                confirmation.appointment_id, confirmation.confidence, confirmation.reference
            ),
            PaymentMark::AlreadyPaid(_) => debug!(
                "Appointment {} was already paid",
                confirmation.appointment_id
            ),
        }

        Ok(mark)
    }
}
