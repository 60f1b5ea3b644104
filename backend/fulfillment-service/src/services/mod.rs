/// Business logic: OTP verification, payment orders, purchase fulfillment
/// and the outbound collaborators they depend on.
pub mod email;
pub mod fulfillment;
pub mod otp;
pub mod otp_store;
pub mod payment_order;
pub mod signature;
pub mod storage;
pub mod verification_token;

pub use email::{EmailMessage, Notifier, SmtpNotifier};
pub use fulfillment::{FulfillmentOutcome, FulfillmentService, FulfillmentStage};
pub use otp::{OtpVerified, OtpVerifier};
pub use otp_store::{InMemoryOtpStore, OtpStore, RedisOtpStore, SharedConnectionManager};
pub use payment_order::{PaymentGateway, PaymentOrderService, RazorpayGateway};
pub use signature::PaymentSignatureVerifier;
pub use storage::{BlobStorage, S3BlobStorage};
pub use verification_token::EmailVerificationTokens;
