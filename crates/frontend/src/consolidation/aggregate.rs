//! Cart, catalog and order views priced in the display currency.
//!
//! Every amount is converted into the display currency *before* it is
//! multiplied or summed, so sums never mix currencies.
//!
//! Two failure policies coexist:
//!
//! - live views (cart, catalog pages, checkout) fail as a whole when a
//!   required backend call or an arithmetic step fails
//! - recommendations, search and order history degrade: the failed piece is
//!   replaced by a fallback and reported in [`Degraded::issues`]

use std::collections::{BTreeSet, HashMap};

use boutique_core::{
    Address, CartItem, CreditCardInfo, CurrencyCode, CurrencyConverter, Degraded, Money,
    MoneyError, OrderResult, PlaceOrderRequest, Product, ProductId, cart_size, product_ids,
};
use chrono::{DateTime, Utc};
use futures::TryFutureExt;
use futures::future::{join_all, try_join_all};
use serde::Serialize;
use tracing::{info, instrument, warn};

use super::{ConsolidationError, Consolidator, RequestContext};
use crate::display::Price;

/// Recommendations shown next to a product or cart.
pub const MAX_RECOMMENDATIONS: usize = 4;

/// A catalog product with its price in the display currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductView {
    #[serde(flatten)]
    pub product: Product,
    pub price: Price,
}

/// One cart line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartLineView {
    pub product: Product,
    pub quantity: u32,
    pub unit_price: Price,
    pub line_total: Price,
}

/// A cart priced in the display currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartView {
    pub currency: CurrencyCode,
    pub items: Vec<CartLineView>,
    pub cart_size: u64,
    pub shipping_cost: Price,
    pub total_cost: Price,
}

/// Shipping and payment details of a checkout.
#[derive(Debug, Clone)]
pub struct OrderDetails {
    pub email: String,
    pub address: Address,
    pub credit_card: CreditCardInfo,
}

/// A placed order and what the visitor paid, in the display currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderConfirmation {
    pub order: OrderResult,
    pub total_paid: Price,
}

/// One line of a past order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderLineView {
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: u32,
    pub cost: Price,
}

/// A past order priced in the currency it was placed in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderView {
    pub order_id: String,
    pub shipping_tracking_id: String,
    pub created_at: Option<DateTime<Utc>>,
    pub currency: CurrencyCode,
    pub shipping_cost: Price,
    pub items: Vec<OrderLineView>,
    pub total_cost: Price,
}

impl Consolidator {
    /// The whole catalog, priced.
    ///
    /// # Errors
    ///
    /// Fails if the catalog is unreachable or a price cannot be converted.
    #[instrument(skip_all, fields(request_id = %ctx.request_id, currency = %ctx.currency))]
    pub async fn products(&self, ctx: &RequestContext) -> Result<Vec<ProductView>, ConsolidationError> {
        let products = self
            .backends
            .catalog
            .list_products()
            .await
            .map_err(ConsolidationError::upstream("catalog"))?;
        Ok(price_products(&self.converter, &ctx.currency, products)?)
    }

    /// One product, priced.
    ///
    /// # Errors
    ///
    /// Fails if the product lookup fails or its price cannot be converted.
    #[instrument(skip_all, fields(request_id = %ctx.request_id, product_id = %id))]
    pub async fn product(&self, ctx: &RequestContext, id: &ProductId) -> Result<ProductView, ConsolidationError> {
        let product = self.raw_product(id).await?;
        Ok(price_product(&self.converter, &ctx.currency, product)?)
    }

    /// One product exactly as the catalog returns it.
    ///
    /// # Errors
    ///
    /// Fails if the product lookup fails.
    pub async fn raw_product(&self, id: &ProductId) -> Result<Product, ConsolidationError> {
        self.backends
            .catalog
            .get_product(id)
            .await
            .map_err(ConsolidationError::upstream("product"))
    }

    /// Lines of the visitor's cart.
    ///
    /// # Errors
    ///
    /// Fails if the cart store is unreachable.
    pub async fn cart_items(&self, ctx: &RequestContext) -> Result<Vec<CartItem>, ConsolidationError> {
        self.backends
            .cart
            .get_cart(ctx.identity.key())
            .await
            .map_err(ConsolidationError::upstream("cart"))
    }

    /// Number of units in the visitor's cart.
    ///
    /// # Errors
    ///
    /// Fails if the cart store is unreachable.
    pub async fn cart_size(&self, ctx: &RequestContext) -> Result<u64, ConsolidationError> {
        Ok(cart_size(&self.cart_items(ctx).await?))
    }

    /// The visitor's cart with line totals, shipping and grand total.
    ///
    /// The shipping quote and the product lookups run concurrently. If any
    /// product lookup fails, no view is produced.
    ///
    /// # Errors
    ///
    /// Fails if the cart, the shipping quote or any product lookup fails, or
    /// if an amount overflows.
    #[instrument(skip_all, fields(request_id = %ctx.request_id, identity = %ctx.identity, currency = %ctx.currency))]
    pub async fn cart_view(&self, ctx: &RequestContext) -> Result<CartView, ConsolidationError> {
        let items = self.cart_items(ctx).await?;

        let quote = self
            .backends
            .shipping
            .quote(&items)
            .map_err(ConsolidationError::upstream("shipping quote"));
        let products = try_join_all(product_ids(&items).map(|id| {
            self.backends
                .catalog
                .get_product(id)
                .map_err(ConsolidationError::upstream("product"))
        }));
        let (shipping_usd, products) = tokio::try_join!(quote, products)?;

        Ok(build_cart_view(
            &self.converter,
            &ctx.currency,
            items,
            products,
            &shipping_usd,
        )?)
    }

    /// Up to [`MAX_RECOMMENDATIONS`] catalog products not in `exclude`.
    ///
    /// Best-effort: any failure yields an empty list.
    #[instrument(skip_all, fields(request_id = %ctx.request_id))]
    pub async fn recommendations(
        &self,
        ctx: &RequestContext,
        exclude: &[ProductId],
    ) -> Degraded<Vec<ProductView>> {
        let products = match self.backends.catalog.list_products().await {
            Ok(products) => products,
            Err(e) => {
                warn!(error = %e, "Recommendations unavailable");
                return Degraded::with_issue(Vec::new(), format!("recommendations unavailable: {e}"));
            }
        };

        let picked = products
            .into_iter()
            .filter(|p| !exclude.contains(&p.id))
            .take(MAX_RECOMMENDATIONS)
            .collect();
        match price_products(&self.converter, &ctx.currency, picked) {
            Ok(views) => Degraded::complete(views),
            Err(e) => {
                warn!(error = %e, "Recommendations could not be priced");
                Degraded::with_issue(Vec::new(), format!("recommendations not priced: {e}"))
            }
        }
    }

    /// Catalog search, priced.
    ///
    /// Best-effort: any failure yields an empty list. A blank query matches
    /// nothing and makes no backend call.
    #[instrument(skip_all, fields(request_id = %ctx.request_id, query = %query))]
    pub async fn search(&self, ctx: &RequestContext, query: &str) -> Degraded<Vec<ProductView>> {
        let query = query.trim();
        if query.is_empty() {
            return Degraded::complete(Vec::new());
        }
        let products = match self.backends.catalog.search_products(query).await {
            Ok(products) => products,
            Err(e) => {
                warn!(error = %e, "Search failed");
                return Degraded::with_issue(Vec::new(), format!("search unavailable: {e}"));
            }
        };
        match price_products(&self.converter, &ctx.currency, products) {
            Ok(views) => Degraded::complete(views),
            Err(e) => {
                warn!(error = %e, "Search results could not be priced");
                Degraded::with_issue(Vec::new(), format!("search results not priced: {e}"))
            }
        }
    }

    /// Add a product to the visitor's cart after checking it exists.
    ///
    /// # Errors
    ///
    /// Fails if the product lookup or the cart update fails.
    #[instrument(skip_all, fields(request_id = %ctx.request_id, product_id = %product_id, quantity = quantity))]
    pub async fn add_to_cart(
        &self,
        ctx: &RequestContext,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<(), ConsolidationError> {
        let product = self.raw_product(product_id).await?;
        self.backends
            .cart
            .add_item(ctx.identity.key(), &CartItem::new(product.id, quantity))
            .await
            .map_err(ConsolidationError::upstream("cart"))
    }

    /// Set the quantity of one cart line.
    ///
    /// # Errors
    ///
    /// Fails if the cart store rejects the update.
    #[instrument(skip_all, fields(request_id = %ctx.request_id, product_id = %item.product_id, quantity = item.quantity))]
    pub async fn update_cart_item(&self, ctx: &RequestContext, item: &CartItem) -> Result<(), ConsolidationError> {
        self.backends
            .cart
            .update_item(ctx.identity.key(), item)
            .await
            .map_err(ConsolidationError::upstream("cart"))
    }

    /// Remove every line from the visitor's cart.
    ///
    /// # Errors
    ///
    /// Fails if the cart store is unreachable.
    #[instrument(skip_all, fields(request_id = %ctx.request_id))]
    pub async fn empty_cart(&self, ctx: &RequestContext) -> Result<(), ConsolidationError> {
        self.backends
            .cart
            .empty_cart(ctx.identity.key())
            .await
            .map_err(ConsolidationError::upstream("cart"))
    }

    /// Place an order for the visitor and compute what was paid.
    ///
    /// # Errors
    ///
    /// Fails if checkout fails. Problems computing the paid total after the
    /// order went through are reported as issues.
    #[instrument(skip_all, fields(request_id = %ctx.request_id, identity = %ctx.identity, currency = %ctx.currency))]
    pub async fn place_order(
        &self,
        ctx: &RequestContext,
        details: OrderDetails,
    ) -> Result<Degraded<OrderConfirmation>, ConsolidationError> {
        let request = PlaceOrderRequest {
            user_id: ctx.identity.key().to_string(),
            user_currency: ctx.currency.to_string(),
            address: details.address,
            email: details.email,
            credit_card: details.credit_card,
        };
        let order = self
            .backends
            .checkout
            .place_order(&request)
            .await
            .map_err(ConsolidationError::upstream("checkout"))?;
        info!(order_id = %order.order_id, "Order placed");

        let total_paid = total_paid(&self.converter, &order, &ctx.currency);
        for issue in &total_paid.issues {
            warn!(order_id = %order.order_id, issue = %issue, "Total paid degraded");
        }
        Ok(total_paid.map(|total| OrderConfirmation {
            order,
            total_paid: Price::from(total),
        }))
    }

    /// Past orders of `user_id`, each priced in its own currency.
    ///
    /// Product names and per-field conversions are best-effort.
    ///
    /// # Errors
    ///
    /// Fails only if the order history itself cannot be fetched.
    #[instrument(skip_all, fields(request_id = %ctx.request_id, user_id = %user_id))]
    pub async fn order_history(
        &self,
        ctx: &RequestContext,
        user_id: &str,
    ) -> Result<Degraded<Vec<OrderView>>, ConsolidationError> {
        let orders = self
            .backends
            .checkout
            .order_history(user_id)
            .await
            .map_err(ConsolidationError::upstream("order history"))?;

        let ids: BTreeSet<&ProductId> = orders
            .iter()
            .flat_map(|o| o.items.iter().map(|i| &i.item.product_id))
            .collect();
        let lookups = join_all(ids.into_iter().map(|id| async move {
            (id, self.backends.catalog.get_product(id).await)
        }))
        .await;

        let mut result = Degraded::complete(Vec::with_capacity(orders.len()));
        let mut names = HashMap::new();
        for (id, lookup) in lookups {
            match lookup {
                Ok(product) => {
                    names.insert(id.clone(), product.name);
                }
                Err(e) => {
                    warn!(product_id = %id, error = %e, "Product name unavailable");
                    result.push_issue(format!("product {id} name unavailable: {e}"));
                }
            }
        }

        for order in &orders {
            let view = order_view(&self.converter, order, &names);
            for issue in &view.issues {
                warn!(order_id = %order.order_id, issue = %issue, "Order view degraded");
            }
            result.issues.extend(view.issues);
            result.value.push(view.value);
        }
        Ok(result)
    }
}

// =============================================================================
// Pure aggregation
// =============================================================================

fn price_product(
    converter: &CurrencyConverter,
    currency: &CurrencyCode,
    product: Product,
) -> Result<ProductView, MoneyError> {
    let price = converter.convert(&product.price_usd, currency)?;
    Ok(ProductView {
        product,
        price: Price::from(price),
    })
}

/// Price every product; the first failure aborts.
///
/// # Errors
///
/// Returns the first conversion error.
pub fn price_products(
    converter: &CurrencyConverter,
    currency: &CurrencyCode,
    products: Vec<Product>,
) -> Result<Vec<ProductView>, MoneyError> {
    products
        .into_iter()
        .map(|p| price_product(converter, currency, p))
        .collect()
}

/// Combine cart lines with their products and a USD shipping quote.
///
/// `products` is parallel to `items`. Lines are kept as the store returned
/// them, even if a product id repeats.
///
/// # Errors
///
/// Returns a conversion or arithmetic error.
pub fn build_cart_view(
    converter: &CurrencyConverter,
    currency: &CurrencyCode,
    items: Vec<CartItem>,
    products: Vec<Product>,
    shipping_usd: &Money,
) -> Result<CartView, MoneyError> {
    let size = cart_size(&items);
    let mut total = Money::zero(currency.clone());
    let mut lines = Vec::with_capacity(items.len());

    for (item, product) in items.into_iter().zip(products) {
        let unit = converter.convert(&product.price_usd, currency)?;
        let line = unit.multiply_slow(item.quantity)?;
        total = total.sum(&line)?;
        lines.push(CartLineView {
            product,
            quantity: item.quantity,
            unit_price: Price::from(unit),
            line_total: Price::from(line),
        });
    }

    let shipping = converter.convert(shipping_usd, currency)?;
    total = total.sum(&shipping)?;

    Ok(CartView {
        currency: currency.clone(),
        items: lines,
        cart_size: size,
        shipping_cost: Price::from(shipping),
        total_cost: Price::from(total),
    })
}

/// Currency an order's money fields are stored in.
fn stored_currency(order: &OrderResult) -> CurrencyCode {
    order
        .shipping_cost
        .as_ref()
        .or_else(|| order.items.iter().find_map(|i| i.cost.as_ref()))
        .map_or_else(CurrencyCode::usd, |m| m.currency_code.clone())
}

/// Shipping plus every item cost times quantity, in the stored currency.
fn stored_total(order: &OrderResult) -> Result<Money, MoneyError> {
    let currency = stored_currency(order);
    let mut total = order
        .shipping_cost
        .clone()
        .unwrap_or_else(|| Money::zero(currency.clone()));
    for line in &order.items {
        if let Some(cost) = &line.cost {
            total = total.sum(&cost.multiply_slow(line.item.quantity)?)?;
        }
    }
    Ok(total)
}

/// Like [`stored_total`], skipping components that are not valid amounts.
fn stored_total_of_valid(
    order: &OrderResult,
    issues: &mut Vec<String>,
) -> Result<Money, MoneyError> {
    let id = &order.order_id;
    let mut total = Money::zero(stored_currency(order));
    let items = order
        .items
        .iter()
        .filter_map(|line| Some((line.cost.as_ref()?, line.item.quantity)));
    let components = order.shipping_cost.iter().map(|cost| (cost, 1)).chain(items);
    for (cost, quantity) in components {
        if !cost.is_valid() {
            issues.push(format!("order {id}: invalid amount left out of total"));
            continue;
        }
        total = total.sum(&cost.multiply_slow(quantity)?)?;
    }
    Ok(total)
}

/// What the visitor paid for `order`, in `target`.
///
/// Falls back to the stored total when the components cannot be summed, and
/// to the unconverted amount when conversion fails.
#[must_use]
pub fn total_paid(
    converter: &CurrencyConverter,
    order: &OrderResult,
    target: &CurrencyCode,
) -> Degraded<Money> {
    let mut result = Degraded::complete(());

    let stored = stored_total(order).unwrap_or_else(|e| {
        result.push_issue(format!("order total not recomputed: {e}"));
        order
            .total_cost
            .clone()
            .unwrap_or_else(|| Money::zero(CurrencyCode::usd()))
    });

    let paid = converter.convert(&stored, target).unwrap_or_else(|e| {
        result.push_issue(format!("total paid not converted to {target}: {e}"));
        stored
    });
    result.map(|()| paid)
}

/// Convert `money`, keeping the original on failure.
fn convert_or_keep(
    converter: &CurrencyConverter,
    money: Money,
    target: &CurrencyCode,
    what: &str,
    issues: &mut Vec<String>,
) -> (Money, bool) {
    match converter.convert(&money, target) {
        Ok(converted) => (converted, true),
        Err(e) => {
            issues.push(format!("{what} not converted to {target}: {e}"));
            (money, false)
        }
    }
}

/// Price a stored order in the currency it was placed in.
///
/// Shipping and each item cost are converted independently; a failed
/// conversion keeps that field's stored value. The total is recomputed from
/// the converted fields; when any field kept its stored value or the sum
/// fails, the stored total is shown unconverted instead. Without a stored
/// total it is summed from the stored fields, leaving out invalid ones.
#[must_use]
pub fn order_view(
    converter: &CurrencyConverter,
    order: &OrderResult,
    names: &HashMap<ProductId, String>,
) -> Degraded<OrderView> {
    let mut issues = Vec::new();
    let currency = order
        .user_currency
        .as_deref()
        .filter(|c| !c.is_empty())
        .map_or_else(CurrencyCode::usd, CurrencyCode::from);
    let zero = || Money::zero(CurrencyCode::usd());
    let id = &order.order_id;

    let (shipping, mut all_converted) = convert_or_keep(
        converter,
        order.shipping_cost.clone().unwrap_or_else(zero),
        &currency,
        &format!("order {id}: shipping cost"),
        &mut issues,
    );

    let mut lines = Vec::with_capacity(order.items.len());
    let mut costs = Vec::with_capacity(order.items.len());
    for line in &order.items {
        let product_id = &line.item.product_id;
        let (cost, converted) = convert_or_keep(
            converter,
            line.cost.clone().unwrap_or_else(zero),
            &currency,
            &format!("order {id}: cost of {product_id}"),
            &mut issues,
        );
        all_converted &= converted;
        costs.push((cost.clone(), line.item.quantity));
        lines.push(OrderLineView {
            product_id: product_id.clone(),
            product_name: names
                .get(product_id)
                .cloned()
                .unwrap_or_else(|| product_id.to_string()),
            quantity: line.item.quantity,
            cost: Price::from(cost),
        });
    }

    let recomputed = if all_converted {
        costs.iter().try_fold(shipping.clone(), |total, (cost, quantity)| {
            total.sum(&cost.multiply_slow(*quantity)?)
        })
    } else {
        Err(MoneyError::InvalidValue("a component was not converted".to_string()))
    };
    let total = recomputed.unwrap_or_else(|e| {
        issues.push(format!("order {id}: total shown unconverted: {e}"));
        order
            .total_cost
            .clone()
            .map_or_else(|| stored_total_of_valid(order, &mut issues), Ok)
            .unwrap_or_else(|e| {
                issues.push(format!("order {id}: total not recomputed: {e}"));
                zero()
            })
    });

    Degraded {
        value: OrderView {
            order_id: id.to_string(),
            shipping_tracking_id: order.shipping_tracking_id.clone(),
            created_at: order.created_at_utc(),
            currency,
            shipping_cost: Price::from(shipping),
            items: lines,
            total_cost: Price::from(total),
        },
        issues,
    }
}
