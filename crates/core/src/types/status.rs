//! Status and category enums stored as Postgres enum types.
//!
//! Every enum serializes in `snake_case`, matches the Postgres type of the
//! same name in the `laundry` schema, and round-trips through `Display` /
//! `FromStr` so route handlers can validate raw strings from JSON bodies and
//! query parameters.

use serde::{Deserialize, Serialize};

/// Error returned when a string does not name any variant of an enum.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown {kind} `{value}`, expected one of: {expected}")]
pub struct UnknownVariant {
    /// Human readable name of the enum, e.g. "order status".
    pub kind: &'static str,
    /// The rejected input.
    pub value: String,
    /// Comma separated list of accepted values.
    pub expected: String,
}

macro_rules! db_enum {
    (
        $(#[$meta:meta])*
        $name:ident as $pg_type:tt, $kind:literal {
            $( $(#[$vmeta:meta])* $variant:ident => $text:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[cfg_attr(feature = "postgres", derive(sqlx::Type))]
        #[cfg_attr(
            feature = "postgres",
            sqlx(type_name = $pg_type, rename_all = "snake_case")
        )]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $( $(#[$vmeta])* $variant ),+
        }

        impl $name {
            /// Every variant in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// The wire and database spelling of this variant.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }

            /// Accepted spellings joined with `", "`, for error messages.
            #[must_use]
            pub fn choices() -> String {
                Self::ALL
                    .iter()
                    .map(|v| v.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let needle = s.trim().to_lowercase();
                Self::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str() == needle)
                    .ok_or_else(|| UnknownVariant {
                        kind: $kind,
                        value: s.to_owned(),
                        expected: Self::choices(),
                    })
            }
        }
    };
}

db_enum! {
    /// Lifecycle of an iron/wash order.
    #[derive(Default)]
    OrderStatus as "laundry.order_status", "order status" {
        #[default]
        Pending => "pending",
        Confirmed => "confirmed",
        Processing => "processing",
        Ready => "ready",
        Delivered => "delivered",
        Cancelled => "cancelled",
    }
}

impl OrderStatus {
    /// Orders can be cancelled by the customer until work has started.
    #[must_use]
    pub const fn is_cancellable(self) -> bool {
        matches!(self, Self::Pending | Self::Confirmed)
    }
}

db_enum! {
    /// Payment state of an iron/wash order.
    #[derive(Default)]
    PaymentStatus as "laundry.payment_status", "payment status" {
        #[default]
        Pending => "pending",
        Paid => "paid",
        Failed => "failed",
        Refunded => "refunded",
    }
}

db_enum! {
    /// Lifecycle of a dry-clean pickup request.
    #[derive(Default)]
    DryCleanStatus as "laundry.dry_clean_status", "dry clean status" {
        #[default]
        Pending => "pending",
        Confirmed => "confirmed",
        Processing => "processing",
        Completed => "completed",
        Cancelled => "cancelled",
    }
}

db_enum! {
    /// Triage state of a contact form submission.
    #[derive(Default)]
    ContactStatus as "laundry.contact_status", "contact status" {
        #[default]
        New => "new",
        Read => "read",
        Responded => "responded",
    }
}

db_enum! {
    /// Service a pricing item is quoted for.
    GarmentService as "laundry.garment_service", "service type" {
        Iron => "iron",
        WashIron => "wash_iron",
        RollPress => "roll_press",
        DryClean => "dry_clean",
        PremiumWash => "premium_wash",
        SteamIron => "steam_iron",
    }
}

db_enum! {
    /// Audience a pricing item is listed under.
    #[derive(Default)]
    GenderCategory as "laundry.gender_category", "gender category" {
        #[default]
        Common => "common",
        Men => "men",
        Women => "women",
        Kids => "kids",
    }
}

db_enum! {
    /// Customer's preferred turnaround.
    #[derive(Default)]
    ServiceTier as "laundry.service_tier", "service type" {
        Express => "express",
        #[default]
        Standard => "standard",
        Economy => "economy",
    }
}

db_enum! {
    /// How a customer wants to be contacted about orders.
    #[derive(Default)]
    CommunicationPreference as "laundry.communication_preference", "communication preference" {
        Sms => "sms",
        Email => "email",
        #[default]
        Both => "both",
    }
}
