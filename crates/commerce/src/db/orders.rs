//! Order repository: creation, lookup, status persistence, and the
//! compare-and-set ownership write that reconciliation relies on.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use cloudberry_core::{
    Email, Money, OrderId, OrderLineId, OrderStatus, ProductId, UserId,
};
use rand::Rng;
use rand::distr::Alphanumeric;
use sqlx::PgPool;

use super::RepositoryError;
use crate::error::CommerceError;
use crate::models::{AddressSnapshot, NewOrder, NewOrderLine, Order, OrderLine};
use crate::promotion::PromoError;

/// Column list shared by every order query, in [`OrderRow`] field order.
const ORDER_COLUMNS: &str = "id, order_number, owner_id, guest_email, guest_phone, \
     subtotal, shipping, discount, total, status, payment_method, promo_code, \
     ship_first_name, ship_last_name, ship_phone, ship_email, \
     ship_street, ship_city, ship_region, ship_postal_code, \
     tracking_number, notes, created_at, updated_at";

const LINE_COLUMNS: &str = "id, order_id, product_id, product_name, unit_price, quantity";

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    order_number: String,
    owner_id: Option<UserId>,
    guest_email: Option<Email>,
    guest_phone: Option<String>,
    subtotal: Money,
    shipping: Money,
    discount: Money,
    total: Money,
    status: OrderStatus,
    payment_method: String,
    promo_code: Option<String>,
    ship_first_name: String,
    ship_last_name: String,
    ship_phone: Option<String>,
    ship_email: Option<Email>,
    ship_street: String,
    ship_city: String,
    ship_region: String,
    ship_postal_code: String,
    tracking_number: Option<String>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct OrderLineRow {
    id: OrderLineId,
    order_id: OrderId,
    product_id: ProductId,
    product_name: String,
    unit_price: Money,
    quantity: i32,
}

impl TryFrom<OrderLineRow> for OrderLine {
    type Error = RepositoryError;

    fn try_from(row: OrderLineRow) -> Result<Self, Self::Error> {
        let quantity = u32::try_from(row.quantity).ok().filter(|&q| q >= 1).ok_or_else(|| {
            RepositoryError::DataCorruption(format!(
                "order line {} has invalid quantity {}",
                row.id, row.quantity
            ))
        })?;

        Ok(Self {
            id: row.id,
            order_id: row.order_id,
            product_id: row.product_id,
            product_name: row.product_name,
            unit_price: row.unit_price,
            quantity,
        })
    }
}

/// Map an order row plus its lines onto the domain type, verifying the money
/// invariant on the way out.
fn assemble(row: OrderRow, lines: Vec<OrderLine>) -> Result<Order, RepositoryError> {
    let order = Order {
        id: row.id,
        order_number: row.order_number,
        owner_id: row.owner_id,
        guest_email: row.guest_email,
        guest_phone: row.guest_phone,
        subtotal: row.subtotal,
        shipping: row.shipping,
        discount: row.discount,
        total: row.total,
        status: row.status,
        shipping_address: AddressSnapshot {
            first_name: row.ship_first_name,
            last_name: row.ship_last_name,
            phone: row.ship_phone,
            email: row.ship_email,
            street: row.ship_street,
            city: row.ship_city,
            region: row.ship_region,
            postal_code: row.ship_postal_code,
        },
        payment_method: row.payment_method,
        promo_code: row.promo_code,
        tracking_number: row.tracking_number,
        notes: row.notes,
        created_at: row.created_at,
        updated_at: row.updated_at,
        lines,
    };

    if !order.money_consistent() {
        return Err(RepositoryError::DataCorruption(format!(
            "order {} violates total = subtotal + shipping - discount",
            order.id
        )));
    }

    Ok(order)
}

/// Partial update of the mutable workflow fields.
///
/// `None` fields are left untouched in the database.
#[derive(Debug, Clone, Default)]
pub struct StatusPatch {
    pub status: Option<OrderStatus>,
    pub tracking_number: Option<String>,
    pub notes: Option<String>,
}

impl StatusPatch {
    /// Whether the patch changes anything at all.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.status.is_none() && self.tracking_number.is_none() && self.notes.is_none()
    }
}

/// Result of a compare-and-set ownership write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReassignOutcome {
    /// The order was ownerless and is now linked to the requested owner.
    Linked,
    /// The order already had an owner; nothing was written.
    AlreadyOwned(UserId),
}

/// Repository for order database operations.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Persist a new order with its lines, redeeming the applied promo code
    /// in the same transaction.
    ///
    /// The subtotal is recomputed here from `unit_price * quantity`; client
    /// money fields never reach this function. The order, its lines, and the
    /// promo usage increment commit or roll back as one unit, so a partially
    /// created order is never observable.
    ///
    /// # Errors
    ///
    /// - `CommerceError::Validation` for missing lines, blank address fields,
    ///   or an ownerless order without guest contact.
    /// - `CommerceError::Promo(UsageExhausted)` when the promo cap was
    ///   consumed by a concurrent checkout; the whole order rolls back.
    /// - `CommerceError::Repository` for database failures.
    pub async fn create(&self, new_order: NewOrder) -> Result<Order, CommerceError> {
        validate_new_order(&new_order)?;

        let subtotal = compute_subtotal(&new_order.lines)?;
        let discount = new_order.promo.as_ref().map_or(Money::ZERO, |p| p.discount);
        let total = subtotal
            .checked_add(new_order.shipping)
            .and_then(|gross| gross.checked_sub(discount))
            .ok_or_else(|| {
                CommerceError::Validation("discount exceeds the order amount".to_owned())
            })?;

        let order_number = generate_order_number();

        let mut tx = self.pool.begin().await.map_err(RepositoryError::from)?;

        // Redeem before inserting: the conditional increment is the only
        // guard against concurrent checkouts racing past the usage cap.
        if let Some(promo) = &new_order.promo {
            let redeemed = sqlx::query(
                "UPDATE promo_codes \
                 SET used_count = used_count + 1, updated_at = now() \
                 WHERE id = $1 AND used_count < max_uses",
            )
            .bind(promo.id)
            .execute(&mut *tx)
            .await
            .map_err(RepositoryError::from)?;

            if redeemed.rows_affected() == 0 {
                return Err(PromoError::UsageExhausted.into());
            }
        }

        let insert_sql = format!(
            "INSERT INTO orders (order_number, owner_id, guest_email, guest_phone, \
                 subtotal, shipping, discount, total, status, payment_method, promo_code, \
                 ship_first_name, ship_last_name, ship_phone, ship_email, \
                 ship_street, ship_city, ship_region, ship_postal_code) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19) \
             RETURNING {ORDER_COLUMNS}"
        );

        let row: OrderRow = sqlx::query_as(&insert_sql)
            .bind(&order_number)
            .bind(new_order.owner_id)
            .bind(&new_order.guest_email)
            .bind(&new_order.guest_phone)
            .bind(subtotal)
            .bind(new_order.shipping)
            .bind(discount)
            .bind(total)
            .bind(OrderStatus::Pending)
            .bind(&new_order.payment_method)
            .bind(new_order.promo.as_ref().map(|p| p.code.as_str()))
            .bind(&new_order.shipping_address.first_name)
            .bind(&new_order.shipping_address.last_name)
            .bind(&new_order.shipping_address.phone)
            .bind(&new_order.shipping_address.email)
            .bind(&new_order.shipping_address.street)
            .bind(&new_order.shipping_address.city)
            .bind(&new_order.shipping_address.region)
            .bind(&new_order.shipping_address.postal_code)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(ref db_err) = e
                    && db_err.is_unique_violation()
                {
                    return RepositoryError::Conflict("order number collision".to_owned());
                }
                RepositoryError::from(e)
            })?;

        let line_sql = format!(
            "INSERT INTO order_lines (order_id, product_id, product_name, unit_price, quantity) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {LINE_COLUMNS}"
        );

        let mut lines = Vec::with_capacity(new_order.lines.len());
        for line in &new_order.lines {
            let quantity = i32::try_from(line.quantity).map_err(|_| {
                CommerceError::Validation(format!("line quantity {} is too large", line.quantity))
            })?;

            let line_row: OrderLineRow = sqlx::query_as(&line_sql)
                .bind(row.id)
                .bind(line.product_id)
                .bind(&line.product_name)
                .bind(line.unit_price)
                .bind(quantity)
                .fetch_one(&mut *tx)
                .await
                .map_err(RepositoryError::from)?;

            lines.push(OrderLine::try_from(line_row)?);
        }

        tx.commit().await.map_err(RepositoryError::from)?;

        tracing::info!(
            order_id = %row.id,
            order_number = %order_number,
            total = %total,
            "Order created"
        );

        Ok(assemble(row, lines)?)
    }

    /// Get an order by ID, including its lines.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if stored data is invalid.
    pub async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1");
        let row: Option<OrderRow> = sqlx::query_as(&sql).bind(id).fetch_optional(self.pool).await?;

        match row {
            Some(r) => {
                let lines = self.lines_for(&[r.id]).await?.remove(&r.id).unwrap_or_default();
                Ok(Some(assemble(r, lines)?))
            }
            None => Ok(None),
        }
    }

    /// List an owner's orders, newest first, including lines.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_by_owner(&self, owner: UserId) -> Result<Vec<Order>, RepositoryError> {
        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE owner_id = $1 ORDER BY created_at DESC"
        );
        let rows: Vec<OrderRow> = sqlx::query_as(&sql).bind(owner).fetch_all(self.pool).await?;
        self.attach_lines(rows).await
    }

    /// List ownerless orders matching the given guest contact, oldest first.
    ///
    /// Email matching is case-insensitive by construction: [`Email`] is
    /// normalized to lowercase at parse time and stored that way.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_by_guest_contact(
        &self,
        email: Option<&Email>,
        phone: Option<&str>,
    ) -> Result<Vec<Order>, RepositoryError> {
        if email.is_none() && phone.is_none() {
            return Ok(Vec::new());
        }

        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM orders \
             WHERE owner_id IS NULL \
               AND (($1::text IS NOT NULL AND guest_email = $1) \
                 OR ($2::text IS NOT NULL AND guest_phone = $2)) \
             ORDER BY created_at ASC"
        );
        let rows: Vec<OrderRow> = sqlx::query_as(&sql)
            .bind(email.map(Email::as_str))
            .bind(phone)
            .fetch_all(self.pool)
            .await?;
        self.attach_lines(rows).await
    }

    /// List orders for the admin console, optionally filtered by status,
    /// newest first, including lines.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, status: Option<OrderStatus>) -> Result<Vec<Order>, RepositoryError> {
        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM orders \
             WHERE $1::order_status IS NULL OR status = $1 \
             ORDER BY created_at DESC"
        );
        let rows: Vec<OrderRow> = sqlx::query_as(&sql).bind(status).fetch_all(self.pool).await?;
        self.attach_lines(rows).await
    }

    /// Apply a partial update to status, tracking number, and notes.
    ///
    /// Pure persistence: transition legality is the workflow's concern, not
    /// this layer's. When `expected` is given, the write only lands if the
    /// stored status still matches it, which lets the workflow close the gap
    /// between its legality check and the update.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order doesn't exist.
    /// Returns `RepositoryError::Conflict` if `expected` no longer matches.
    pub async fn update_status(
        &self,
        id: OrderId,
        expected: Option<OrderStatus>,
        patch: StatusPatch,
    ) -> Result<Order, RepositoryError> {
        let sql = format!(
            "UPDATE orders \
             SET status = COALESCE($2, status), \
                 tracking_number = COALESCE($3, tracking_number), \
                 notes = COALESCE($4, notes), \
                 updated_at = now() \
             WHERE id = $1 AND ($5::order_status IS NULL OR status = $5) \
             RETURNING {ORDER_COLUMNS}"
        );

        let row: Option<OrderRow> = sqlx::query_as(&sql)
            .bind(id)
            .bind(patch.status)
            .bind(&patch.tracking_number)
            .bind(&patch.notes)
            .bind(expected)
            .fetch_optional(self.pool)
            .await?;

        match row {
            Some(r) => {
                let lines = self.lines_for(&[r.id]).await?.remove(&r.id).unwrap_or_default();
                Ok(assemble(r, lines)?)
            }
            None => {
                let exists: Option<(OrderId,)> =
                    sqlx::query_as("SELECT id FROM orders WHERE id = $1")
                        .bind(id)
                        .fetch_optional(self.pool)
                        .await?;
                match exists {
                    Some(_) => Err(RepositoryError::Conflict(
                        "order status changed concurrently".to_owned(),
                    )),
                    None => Err(RepositoryError::NotFound),
                }
            }
        }
    }

    /// Assign an owner to an ownerless order with a single conditional write.
    ///
    /// This compare-and-set is the sole concurrency guard for identity
    /// reconciliation: an order is linked at most once, and an existing
    /// owner is never overwritten. Reassigning an already-owned order
    /// reports [`ReassignOutcome::AlreadyOwned`] rather than erroring, which
    /// keeps retried reconciliations idempotent.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order doesn't exist.
    pub async fn reassign_owner(
        &self,
        id: OrderId,
        owner: UserId,
    ) -> Result<ReassignOutcome, RepositoryError> {
        let result = sqlx::query(
            "UPDATE orders SET owner_id = $2, updated_at = now() \
             WHERE id = $1 AND owner_id IS NULL",
        )
        .bind(id)
        .bind(owner)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 1 {
            tracing::info!(order_id = %id, owner_id = %owner, "Order linked to owner");
            return Ok(ReassignOutcome::Linked);
        }

        let current: Option<(Option<UserId>,)> =
            sqlx::query_as("SELECT owner_id FROM orders WHERE id = $1")
                .bind(id)
                .fetch_optional(self.pool)
                .await?;

        match current {
            None => Err(RepositoryError::NotFound),
            Some((Some(existing),)) => Ok(ReassignOutcome::AlreadyOwned(existing)),
            // owner_id is one-way, so a missed CAS with a null owner means
            // the row vanished between the two statements
            Some((None,)) => Err(RepositoryError::Conflict(
                "ownerless order was not claimed".to_owned(),
            )),
        }
    }

    /// Claim every ownerless order whose guest phone matches exactly.
    ///
    /// One conditional bulk write; returns the number of orders linked.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn claim_guest_orders_by_phone(
        &self,
        phone: &str,
        owner: UserId,
    ) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            "UPDATE orders SET owner_id = $1, updated_at = now() \
             WHERE owner_id IS NULL AND guest_phone = $2",
        )
        .bind(owner)
        .bind(phone)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Claim every ownerless order whose guest email matches the registered
    /// address (case-insensitive via stored normalization).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn claim_guest_orders_by_email(
        &self,
        email: &Email,
        owner: UserId,
    ) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            "UPDATE orders SET owner_id = $1, updated_at = now() \
             WHERE owner_id IS NULL AND guest_email = $2",
        )
        .bind(owner)
        .bind(email)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Fetch lines for a set of orders, grouped by order ID.
    async fn lines_for(
        &self,
        order_ids: &[OrderId],
    ) -> Result<HashMap<OrderId, Vec<OrderLine>>, RepositoryError> {
        if order_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let ids: Vec<i64> = order_ids.iter().map(|id| id.as_i64()).collect();
        let sql = format!(
            "SELECT {LINE_COLUMNS} FROM order_lines WHERE order_id = ANY($1) ORDER BY id"
        );
        let rows: Vec<OrderLineRow> =
            sqlx::query_as(&sql).bind(&ids).fetch_all(self.pool).await?;

        let mut grouped: HashMap<OrderId, Vec<OrderLine>> = HashMap::new();
        for row in rows {
            let line = OrderLine::try_from(row)?;
            grouped.entry(line.order_id).or_default().push(line);
        }
        Ok(grouped)
    }

    /// Attach lines to a batch of order rows, preserving row order.
    async fn attach_lines(&self, rows: Vec<OrderRow>) -> Result<Vec<Order>, RepositoryError> {
        let ids: Vec<OrderId> = rows.iter().map(|r| r.id).collect();
        let mut grouped = self.lines_for(&ids).await?;

        let mut orders = Vec::with_capacity(rows.len());
        for row in rows {
            let lines = grouped.remove(&row.id).unwrap_or_default();
            orders.push(assemble(row, lines)?);
        }
        Ok(orders)
    }
}

/// Reject structurally invalid input before touching the database.
fn validate_new_order(new_order: &NewOrder) -> Result<(), CommerceError> {
    if new_order.lines.is_empty() {
        return Err(CommerceError::Validation(
            "order must contain at least one line".to_owned(),
        ));
    }

    if new_order.lines.iter().any(|l| l.quantity < 1) {
        return Err(CommerceError::Validation(
            "line quantity must be at least 1".to_owned(),
        ));
    }

    let missing = new_order.shipping_address.missing_fields();
    if !missing.is_empty() {
        return Err(CommerceError::Validation(format!(
            "missing required address fields: {}",
            missing.join(", ")
        )));
    }

    if new_order.payment_method.trim().is_empty() {
        return Err(CommerceError::Validation(
            "payment method is required".to_owned(),
        ));
    }

    let has_guest_contact = new_order.guest_email.is_some()
        || new_order
            .guest_phone
            .as_deref()
            .is_some_and(|p| !p.trim().is_empty());
    if new_order.owner_id.is_none() && !has_guest_contact {
        return Err(CommerceError::Validation(
            "guest orders require an email or phone contact".to_owned(),
        ));
    }

    Ok(())
}

/// Sum `unit_price * quantity` across the lines.
fn compute_subtotal(lines: &[NewOrderLine]) -> Result<Money, CommerceError> {
    lines
        .iter()
        .try_fold(Money::ZERO, |acc, line| {
            line.unit_price
                .checked_mul(line.quantity)
                .and_then(|line_total| acc.checked_add(line_total))
        })
        .ok_or_else(|| CommerceError::Validation("order subtotal overflows".to_owned()))
}

/// Generate a human-facing order reference like `CB-9X2K4M7Q`.
fn generate_order_number() -> String {
    let suffix: String = rand::rng()
        .sample_iter(Alphanumeric)
        .take(8)
        .map(char::from)
        .collect::<String>()
        .to_uppercase();
    format!("CB-{suffix}")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use cloudberry_core::ProductId;

    fn line(price: i64, quantity: u32) -> NewOrderLine {
        NewOrderLine {
            product_id: ProductId::new(1),
            product_name: "Lingonberry preserve".into(),
            unit_price: Money::from_minor(price).unwrap(),
            quantity,
        }
    }

    fn valid_new_order() -> NewOrder {
        NewOrder {
            owner_id: None,
            guest_email: Some(Email::parse("guest@example.com").unwrap()),
            guest_phone: None,
            lines: vec![line(2500, 2)],
            shipping_address: AddressSnapshot {
                first_name: "Maja".into(),
                last_name: "Lindqvist".into(),
                phone: None,
                email: None,
                street: "Storgatan 1".into(),
                city: "Umeå".into(),
                region: "Västerbotten".into(),
                postal_code: "90326".into(),
            },
            payment_method: "invoice".into(),
            shipping: Money::from_minor(495).unwrap(),
            promo: None,
        }
    }

    #[test]
    fn test_validate_requires_lines() {
        let mut order = valid_new_order();
        order.lines.clear();
        assert!(matches!(
            validate_new_order(&order),
            Err(CommerceError::Validation(msg)) if msg.contains("at least one line")
        ));
    }

    #[test]
    fn test_validate_rejects_zero_quantity() {
        let mut order = valid_new_order();
        order.lines = vec![line(2500, 0)];
        assert!(validate_new_order(&order).is_err());
    }

    #[test]
    fn test_validate_reports_missing_address_fields() {
        let mut order = valid_new_order();
        order.shipping_address.city = String::new();
        assert!(matches!(
            validate_new_order(&order),
            Err(CommerceError::Validation(msg)) if msg.contains("city")
        ));
    }

    #[test]
    fn test_validate_guest_needs_contact() {
        let mut order = valid_new_order();
        order.guest_email = None;
        order.guest_phone = Some("   ".into());
        assert!(validate_new_order(&order).is_err());

        order.guest_phone = Some("+46701234567".into());
        assert!(validate_new_order(&order).is_ok());
    }

    #[test]
    fn test_validate_owned_order_needs_no_contact() {
        let mut order = valid_new_order();
        order.owner_id = Some(UserId::new(9));
        order.guest_email = None;
        order.guest_phone = None;
        assert!(validate_new_order(&order).is_ok());
    }

    #[test]
    fn test_compute_subtotal() {
        let lines = vec![line(2500, 2), line(999, 3)];
        assert_eq!(compute_subtotal(&lines).unwrap().as_minor(), 7997);
    }

    #[test]
    fn test_compute_subtotal_overflow() {
        let lines = vec![line(i64::MAX, 2)];
        assert!(compute_subtotal(&lines).is_err());
    }

    #[test]
    fn test_order_number_shape() {
        let n = generate_order_number();
        assert!(n.starts_with("CB-"));
        assert_eq!(n.len(), 11);
        assert!(n[3..].chars().all(|c| c.is_ascii_alphanumeric()));
    }
}
