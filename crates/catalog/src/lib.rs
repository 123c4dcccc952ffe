//! Service catalog and price resolution.
//!
//! Published services are read-only here: this crate turns a service (and an
//! optional package choice) into the priced snapshot an order freezes at
//! creation. No IO; listings come in already loaded.

pub mod delivery;
pub mod document;
pub mod localized;
pub mod money;
pub mod pricing;
pub mod service;

pub use delivery::DeliveryTime;
pub use localized::{Blank, Localized};
pub use money::{CurrencyFormatter, Money, PriceInput, StandardCurrencyFormatter, normalize_price};
pub use pricing::{PricedSelection, STANDARD_PACKAGE_NAME, SelectionSource, resolve};
pub use service::{LocalizedServiceView, Package, Service, ServiceId};
