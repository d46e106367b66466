//! Domain models for the laundry API.
//!
//! Models serialize straight into API responses, so field names here are
//! the JSON field names the frontend reads.

pub mod dry_clean;
pub mod order;
pub mod otp;
pub mod password_reset;
pub mod pricing;
pub mod session;
pub mod user;

pub use dry_clean::{Contact, DryCleanOrder, DryCleanStatistics, NewContact, NewDryCleanOrder};
pub use order::{
    NewOrder, NewOrderItem, Order, OrderCustomer, OrderDetail, OrderItem, OrderStatistics,
    OrderWithItems,
};
pub use otp::{OtpPurpose, OtpRecord};
pub use password_reset::PasswordResetToken;
pub use pricing::{
    Category, CategoryGroup, CategorySeed, ItemSeed, PriceList, PricingItem, PricingSummary,
};
pub use session::{CurrentUser, NewSession, Session};
pub use user::{NewUser, ProfileChanges, User, UserCredentials, UserProfile};
