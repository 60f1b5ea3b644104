/// Purchase fulfillment
///
/// Turns a signed payment confirmation into a download link:
///
/// ```text
/// Received -> SignatureChecked -> ProductResolved -> LinkMinted -> Recorded
///          -> NotifyAttempted -> Completed
/// ```
///
/// `Recorded` is the commit point. Nothing before it is visible to the buyer
/// and every failure before it leaves the ledger untouched. The confirmation
/// email is sent after it on a detached task and cannot fail the purchase.
use crate::db::{AppendOutcome, CatalogStore, PurchaseLedger};
use crate::error::{AppError, Result};
use crate::metrics;
use crate::models::{PurchaseRecord, PurchaseRequest};
use crate::services::email::{EmailMessage, Notifier};
use crate::services::signature::PaymentSignatureVerifier;
use crate::services::storage::{resolve_object_key, BlobStorage};
use crate::services::verification_token::EmailVerificationTokens;
use crate::validators::{mask_email, normalize_email, present, required};
use actix_web::ResponseError;
use chrono::{DateTime, Duration, Utc};
use std::fmt;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Lifetime of a minted download link and of the purchase record's `expires_at`
pub const DOWNLOAD_LINK_TTL_SECS: i64 = 3600;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FulfillmentStage {
    Received,
    SignatureChecked,
    ProductResolved,
    LinkMinted,
    Recorded,
    NotifyAttempted,
    Completed,
}

impl FulfillmentStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            FulfillmentStage::Received => "received",
            FulfillmentStage::SignatureChecked => "signature_checked",
            FulfillmentStage::ProductResolved => "product_resolved",
            FulfillmentStage::LinkMinted => "link_minted",
            FulfillmentStage::Recorded => "recorded",
            FulfillmentStage::NotifyAttempted => "notify_attempted",
            FulfillmentStage::Completed => "completed",
        }
    }
}

impl fmt::Display for FulfillmentStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FulfillmentOutcome {
    pub purchase_id: Uuid,
    pub download_link: String,
    pub expires_at: DateTime<Utc>,
    pub project_name: String,
    /// The payment had already been fulfilled; the recorded purchase is returned
    pub replayed: bool,
}

impl From<(PurchaseRecord, bool)> for FulfillmentOutcome {
    fn from((record, replayed): (PurchaseRecord, bool)) -> Self {
        Self {
            purchase_id: record.id,
            download_link: record.download_link,
            expires_at: record.expires_at,
            project_name: record.project_name,
            replayed,
        }
    }
}

/// Validated `/purchase` input
struct PurchaseInput<'a> {
    name: &'a str,
    email: String,
    project_id: &'a str,
    order_id: &'a str,
    payment_id: &'a str,
    signature: &'a str,
    verification_token: Option<&'a str>,
}

impl<'a> PurchaseInput<'a> {
    fn parse(request: &'a PurchaseRequest) -> Result<Self> {
        let missing = || AppError::MissingFields("Missing required fields");
        Ok(Self {
            name: required(&request.name).ok_or_else(missing)?,
            email: required(&request.email)
                .map(normalize_email)
                .ok_or_else(missing)?,
            project_id: required(&request.project_id).ok_or_else(missing)?,
            order_id: present(&request.order_id).ok_or_else(missing)?,
            payment_id: present(&request.payment_id).ok_or_else(missing)?,
            signature: present(&request.signature).ok_or_else(missing)?,
            verification_token: required(&request.verification_token),
        })
    }
}

#[derive(Clone)]
pub struct FulfillmentService {
    catalog: Arc<dyn CatalogStore>,
    storage: Arc<dyn BlobStorage>,
    ledger: Arc<dyn PurchaseLedger>,
    notifier: Arc<dyn Notifier>,
    signatures: PaymentSignatureVerifier,
    tokens: EmailVerificationTokens,
    require_verified_email: bool,
}

impl FulfillmentService {
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        storage: Arc<dyn BlobStorage>,
        ledger: Arc<dyn PurchaseLedger>,
        notifier: Arc<dyn Notifier>,
        signatures: PaymentSignatureVerifier,
        tokens: EmailVerificationTokens,
    ) -> Self {
        Self {
            catalog,
            storage,
            ledger,
            notifier,
            signatures,
            tokens,
            require_verified_email: false,
        }
    }

    /// Reject purchases that do not carry a valid email verification token
    pub fn require_verified_email(mut self, required: bool) -> Self {
        self.require_verified_email = required;
        self
    }

    pub async fn fulfill(&self, request: &PurchaseRequest) -> Result<FulfillmentOutcome> {
        let mut stage = FulfillmentStage::Received;

        match self.run(request, &mut stage).await {
            Ok(outcome) => {
                let result = if outcome.replayed { "replayed" } else { "completed" };
                metrics::record_fulfillment(result, FulfillmentStage::Completed.as_str());
                Ok(outcome)
            }
            Err(e) => {
                if e.status_code().is_server_error() {
                    error!(
                        stage = %stage,
                        order_id = request.order_id.as_deref().unwrap_or_default(),
                        error = %e,
                        "Fulfillment failed"
                    );
                } else {
                    warn!(
                        stage = %stage,
                        order_id = request.order_id.as_deref().unwrap_or_default(),
                        error = %e,
                        "Fulfillment rejected"
                    );
                }
                metrics::record_fulfillment("failed", stage.as_str());
                Err(e)
            }
        }
    }

    async fn run(
        &self,
        request: &PurchaseRequest,
        stage: &mut FulfillmentStage,
    ) -> Result<FulfillmentOutcome> {
        let input = PurchaseInput::parse(request)?;

        if !self
            .signatures
            .verify(input.order_id, input.payment_id, input.signature)
        {
            return Err(AppError::PaymentVerificationFailed);
        }

        if self.require_verified_email {
            let verified = input
                .verification_token
                .is_some_and(|token| self.tokens.validate(&input.email, token, Utc::now()));
            if !verified {
                return Err(AppError::EmailNotVerified);
            }
        }
        *stage = FulfillmentStage::SignatureChecked;

        if let Some(existing) = self
            .ledger
            .find_by_payment(input.order_id, input.payment_id)
            .await?
        {
            info!(
                purchase_id = %existing.id,
                order_id = %input.order_id,
                "Payment already fulfilled; returning recorded purchase"
            );
            return Ok((existing, true).into());
        }

        let product = self
            .catalog
            .get(input.project_id)
            .await?
            .ok_or(AppError::ProductNotFound)?;
        // The key prefix does not affect whether a reference names an object
        let file_ref = product
            .file_reference()
            .filter(|r| resolve_object_key(r, "").is_some())
            .ok_or(AppError::MissingFileReference)?;
        *stage = FulfillmentStage::ProductResolved;

        let created_at = Utc::now();
        let download_link = self
            .storage
            .create_signed_download_url(
                file_ref,
                std::time::Duration::from_secs(DOWNLOAD_LINK_TTL_SECS as u64),
            )
            .await
            .map_err(|e| match e {
                AppError::Storage(msg) => AppError::Storage(msg),
                other => AppError::Storage(other.to_string()),
            })?;
        *stage = FulfillmentStage::LinkMinted;

        let record = PurchaseRecord {
            id: Uuid::new_v4(),
            name: input.name.to_string(),
            email: input.email.clone(),
            project_id: product.id.clone(),
            project_name: product.name.clone(),
            order_id: input.order_id.to_string(),
            payment_id: input.payment_id.to_string(),
            download_link,
            expires_at: created_at + Duration::seconds(DOWNLOAD_LINK_TTL_SECS),
            created_at,
        };

        let record = match self.ledger.append(&record).await {
            Ok(AppendOutcome::Inserted(record)) => record,
            Ok(AppendOutcome::Existing(existing)) => {
                // A concurrent request for the same payment committed first
                info!(
                    purchase_id = %existing.id,
                    order_id = %input.order_id,
                    "Concurrent fulfillment resolved to recorded purchase"
                );
                return Ok((existing, true).into());
            }
            Err(e) => {
                return Err(match e {
                    AppError::LedgerWriteFailed(msg) => AppError::LedgerWriteFailed(msg),
                    other => AppError::LedgerWriteFailed(other.to_string()),
                })
            }
        };
        *stage = FulfillmentStage::Recorded;

        info!(
            purchase_id = %record.id,
            order_id = %record.order_id,
            project_id = %record.project_id,
            email = %mask_email(&record.email),
            "Purchase recorded"
        );

        self.dispatch_confirmation(&record);
        *stage = FulfillmentStage::NotifyAttempted;

        Ok((record, false).into())
    }

    fn dispatch_confirmation(&self, record: &PurchaseRecord) {
        let notifier = Arc::clone(&self.notifier);
        let address = record.email.clone();
        let purchase_id = record.id;
        let message = EmailMessage::purchase_confirmation(
            &record.project_name,
            &record.download_link,
            DOWNLOAD_LINK_TTL_SECS / 60,
        );

        tokio::spawn(async move {
            match notifier.send(&address, &message).await {
                Ok(()) => {
                    metrics::record_notification("sent");
                }
                Err(e) => {
                    warn!(
                        purchase_id = %purchase_id,
                        email = %mask_email(&address),
                        error = %e,
                        "Failed to send purchase confirmation; link was returned to the caller"
                    );
                    metrics::record_notification("failed");
                }
            }
        });
    }
}
