//! # Validation Module
//!
//! Pre-write validation for engine requests.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: THIS MODULE - shape and range checks                         │
//! │  ├── Runs before any write is attempted                                │
//! │  └── Malformed requests never reach a storage backend                  │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Engine referential pre-checks                                │
//! │  └── Product/customer ids resolved against the store                   │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database constraints                                         │
//! │  ├── NOT NULL / UNIQUE (invoice_no, sku)                               │
//! │  └── Foreign keys as the backstop                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::types::{MovementKind, SaleDraft, SaleItemDraft};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Maximum line items in a single sale.
///
/// Prevents runaway requests; configurable per tenant is a later concern.
pub const MAX_SALE_ITEMS: usize = 100;

/// Maximum quantity of a single line.
pub const MAX_LINE_QUANTITY: i64 = 9_999;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a SKU (Stock Keeping Unit).
///
/// ## Rules
/// - Must not be empty
/// - At most 50 characters
/// - Only alphanumeric characters, hyphens, underscores
///
/// ## Example
/// ```rust
/// use vend_core::validation::validate_sku;
///
/// assert!(validate_sku("COKE-330").is_ok());
/// assert!(validate_sku("").is_err());
/// ```
pub fn validate_sku(sku: &str) -> ValidationResult<()> {
    let sku = sku.trim();

    if sku.is_empty() {
        return Err(ValidationError::Required {
            field: "sku".to_string(),
        });
    }

    if sku.len() > 50 {
        return Err(ValidationError::TooLong {
            field: "sku".to_string(),
            max: 50,
        });
    }

    if !sku
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "sku".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(())
}

/// Validates a display name (product, customer, operator).
pub fn validate_name(field: &str, name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if name.len() > 200 {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: 200,
        });
    }

    Ok(())
}

// =============================================================================
// Sale Draft Validation
// =============================================================================

/// Validates a sale draft before any write is attempted.
///
/// ## Rules
/// - Operator reference is required
/// - At least one line item, at most [`MAX_SALE_ITEMS`]
/// - Every line: positive quantity within range, non-negative money
///   fields
/// - Header money fields non-negative (the total itself is
///   caller-computed and trusted)
pub fn validate_sale_draft(draft: &SaleDraft) -> ValidationResult<()> {
    if draft.user_id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "user_id".to_string(),
        });
    }

    if draft.items.is_empty() {
        return Err(ValidationError::EmptySale);
    }

    if draft.items.len() > MAX_SALE_ITEMS {
        return Err(ValidationError::OutOfRange {
            field: "items".to_string(),
            min: 1,
            max: MAX_SALE_ITEMS as i64,
        });
    }

    for money_field in [
        ("subtotal_cents", draft.subtotal_cents),
        ("discount_cents", draft.discount_cents),
        ("tax_cents", draft.tax_cents),
        ("total_cents", draft.total_cents),
    ] {
        if money_field.1 < 0 {
            return Err(ValidationError::MustNotBeNegative {
                field: money_field.0.to_string(),
            });
        }
    }

    for item in &draft.items {
        validate_sale_item(item)?;
    }

    Ok(())
}

fn validate_sale_item(item: &SaleItemDraft) -> ValidationResult<()> {
    if item.quantity <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if item.quantity > MAX_LINE_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_LINE_QUANTITY,
        });
    }

    if item.unit_price_cents < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: "unit_price_cents".to_string(),
        });
    }

    if item.discount_cents < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: "discount_cents".to_string(),
        });
    }

    if item.tax_rate_bps < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: "tax_rate_bps".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Movement Validation
// =============================================================================

/// Validates a stock movement's kind/quantity combination.
///
/// `in`/`out` require a positive magnitude. `adjustment` carries the
/// absolute target quantity, which may legitimately be zero.
pub fn validate_movement(kind: MovementKind, quantity: i64) -> ValidationResult<()> {
    match kind {
        MovementKind::In | MovementKind::Out => {
            if quantity <= 0 {
                return Err(ValidationError::MustBePositive {
                    field: "quantity".to_string(),
                });
            }
        }
        MovementKind::Adjustment => {
            if quantity < 0 {
                return Err(ValidationError::MustNotBeNegative {
                    field: "quantity".to_string(),
                });
            }
        }
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
