//! Payconiq payment products.
//!
//! Builds the URLs and QR codes Payconiq customers scan, creates and cancels
//! point-of-sale payments over REST, and verifies payment status callbacks
//! through [`payconiq_callback`].
//!
//! # Products
//!
//! - [`Predefined`]: static point-of-sale codes, payments created over REST
//! - [`Invoice`] and [`Receipt`]: the whole payment encoded in a URL
//!
//! # Example
//!
//! ```
//! use payconiq_client::{Invoice, ProductConfig, QrCodeOptions, QrFormat, TransferInfo};
//!
//! let invoice = Invoice::new(
//!     "5fb3a2e1bc1b440006ab9e1f",
//!     "00000000-0000-0000-0000-000000000000",
//!     ProductConfig::default(),
//! )?;
//!
//! let info = TransferInfo::builder().amount(1254).reference("INV-2024-001").build();
//! assert_eq!(
//!     invoice.payment_url(&info)?,
//!     "https://payconiq.com/t/1/5fb3a2e1bc1b440006ab9e1f?A=1254&R=INV-2024-001"
//! );
//!
//! let qr = invoice.qr_code_url(&info, &QrCodeOptions::builder().format(QrFormat::Svg).build())?;
//! assert!(qr.ends_with("&f=SVG"));
//! # Ok::<(), payconiq_client::ValidationError>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

/// Amounts in cents.
pub mod amount;
/// Product configuration.
pub mod config;
/// Error types.
pub mod error;
/// Invoice and receipt products.
pub mod invoice;
/// Point-of-sale API wire types.
pub mod payment;
/// Predefined point-of-sale products.
pub mod predefined;
/// The shared product.
pub mod product;
/// QR-code redirector URLs.
pub mod qrcode;
/// REST client.
pub mod rest;
/// Input validation.
pub mod validation;

pub use amount::Amount;
pub use config::ProductConfig;
pub use error::{PayconiqError, Result, ValidationError};
pub use invoice::{Invoice, Receipt};
pub use payconiq_callback::{CallbackPath, Environment, VerifyOptions};
pub use payment::{
    Creditor, Currency, Debtor, Link, Links, PaymentStatus, PosCallbackBody, PosPaymentOptions, PosPaymentRequest,
    PosPaymentResponse, ProviderErrorBody, ProviderErrorCode, TransferInfo,
};
pub use predefined::Predefined;
pub use product::{PayconiqProduct, Product, ProductType};
pub use qrcode::{QrCodeOptions, QrColor, QrFormat, QrSize, make_qr_code_url};
pub use rest::RestClient;
