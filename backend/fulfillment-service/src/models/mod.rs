/// Data models and request/response payloads
pub mod order;
pub mod otp;
pub mod product;
pub mod purchase;

pub use order::{CreateOrderRequest, GatewayOrder, OrderRequest};
pub use otp::{OtpRecord, SendOtpRequest, VerifyOtpRequest};
pub use product::Product;
pub use purchase::{PurchaseRecord, PurchaseRequest};
