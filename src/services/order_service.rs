use std::collections::HashMap;

use rust_decimal::Decimal;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{
    ColumnTrait, DatabaseTransaction, EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
    TryInsertResult,
};

use crate::{
    audit,
    domain::{
        cart::{self, CartEntry},
        checkout::{self, CheckoutAttempt, CheckoutPhase, CheckoutRejection, OrderDraft},
    },
    dto::orders::{CheckoutRequest, CheckoutResult, OrderList},
    emails::{ReceiptInput, render_receipt},
    entity::{
        cart::{Column as CartCol, Entity as Cart},
        orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, Model as OrderModel},
        payment_claims::{ActiveModel as ClaimActive, Entity as PaymentClaims},
        products::{Column as ProdCol, Entity as Products, ProductStatus},
        users::Entity as Users,
    },
    error::{AppError, AppResult},
    integrations::EmailMessage,
    middleware::auth::AuthUser,
    models::Order,
    outbox::{self, DeliveryOutcome},
    response::{ApiResponse, Meta},
    services::cart_service,
    state::AppState,
};

pub async fn list_orders(state: &AppState, user_id: &str) -> AppResult<ApiResponse<OrderList>> {
    let orders = Orders::find()
        .filter(OrderCol::UserId.eq(user_id))
        .order_by_desc(OrderCol::CreatedAt)
        .order_by_desc(OrderCol::Id)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(order_from_entity)
        .collect();

    Ok(ApiResponse::success("Ok", OrderList { orders }, None))
}

/// Turn the submitted lines (or the stored cart) into orders, empty the cart
/// and queue a receipt. Orders, cart clearing and the queued email commit
/// together; delivery happens after the commit and never fails the checkout.
pub async fn checkout(
    state: &AppState,
    user: &AuthUser,
    payload: CheckoutRequest,
) -> AppResult<ApiResponse<CheckoutResult>> {
    let user_id = user.resolve(payload.user_id.as_deref())?.to_string();
    let mut attempt = CheckoutAttempt::new(user_id.as_str());
    attempt.advance(CheckoutPhase::Validating);

    let details = match payload.order_details {
        Some(details) => details,
        None => {
            let entries = cart_service::load_entries(&state.orm, &user_id).await?;
            checkout::details_from_summary(&cart::aggregate(&entries))
        }
    };
    if details.is_empty() {
        attempt.advance(CheckoutPhase::Rejected);
        return Err(AppError::BadRequest(CheckoutRejection::EmptyCart.to_string()));
    }

    attempt.advance(CheckoutPhase::Submitting);
    let submitted = match checkout::build_drafts(&details) {
        Ok(drafts) => drafts,
        Err(rejection) => {
            attempt.advance(CheckoutPhase::Failed);
            return Err(reject(&user_id, rejection));
        }
    };

    let catalog = match active_catalog(state, &submitted).await {
        Ok(catalog) => catalog,
        Err(err) => {
            attempt.advance(CheckoutPhase::Failed);
            return Err(err);
        }
    };
    let drafts = match checkout::price_from_catalog(&submitted, &catalog) {
        Ok(drafts) => drafts,
        Err(rejection) => {
            attempt.advance(CheckoutPhase::Failed);
            return Err(reject(&user_id, rejection));
        }
    };
    let total_amount = checkout::grand_total(&drafts);

    let payment_reference =
        match verify_payment(state, payload.payment_id.as_deref(), total_amount).await {
            Ok(reference) => reference,
            Err(err) => {
                attempt.advance(CheckoutPhase::Failed);
                return Err(err);
            }
        };

    let recipient = match recipient_for(state, user, &user_id).await {
        Ok(recipient) => recipient,
        Err(err) => {
            attempt.advance(CheckoutPhase::Failed);
            return Err(err);
        }
    };

    let committed = persist(
        state,
        &user_id,
        &drafts,
        total_amount,
        payment_reference,
        recipient,
    )
    .await;
    let (orders, outbox_id) = match committed {
        Ok(result) => result,
        Err(err) => {
            attempt.advance(CheckoutPhase::Failed);
            if !matches!(err, AppError::PaymentRequired(_)) {
                tracing::error!(user_id = %user_id, error = %err, "checkout transaction failed");
            }
            return Err(err);
        }
    };
    attempt.advance(CheckoutPhase::Completed);

    let email_sent = match outbox_id {
        Some(id) => match outbox::deliver(state, id).await {
            Ok(DeliveryOutcome::Sent(_)) => true,
            Ok(outcome) => {
                tracing::warn!(user_id = %user_id, outbox_id = %id, ?outcome, "receipt not sent yet");
                false
            }
            Err(err) => {
                tracing::warn!(user_id = %user_id, outbox_id = %id, error = %err, "receipt delivery failed");
                false
            }
        },
        None => {
            tracing::warn!(user_id = %user_id, "no email address on file, receipt not queued");
            false
        }
    };

    audit::record(
        &state.pool,
        &user_id,
        "checkout",
        "orders",
        serde_json::json!({
            "order_ids": orders.iter().map(|o| o.id).collect::<Vec<_>>(),
            "total_amount": total_amount,
        }),
    )
    .await;

    Ok(ApiResponse::success(
        "Checkout success",
        CheckoutResult {
            orders,
            total_amount,
            email_queued: outbox_id.is_some(),
            email_sent,
        },
        Some(Meta::empty()),
    ))
}

fn reject(user_id: &str, rejection: CheckoutRejection) -> AppError {
    match &rejection {
        CheckoutRejection::MissingFields(lines) => {
            tracing::info!(user_id, ?lines, "checkout lines missing required fields");
        }
        CheckoutRejection::Unavailable(products) => {
            tracing::info!(user_id, ?products, "checkout references unavailable products");
        }
        _ => {}
    }
    AppError::BadRequest(rejection.to_string())
}

/// Active products referenced by the drafts, as catalog snapshots.
async fn active_catalog(state: &AppState, drafts: &[OrderDraft]) -> AppResult<HashMap<i32, CartEntry>> {
    let ids: Vec<i32> = drafts.iter().map(|d| d.product_id).collect();
    let products = Products::find()
        .filter(ProdCol::Id.is_in(ids))
        .filter(ProdCol::Status.eq(ProductStatus::Active))
        .all(&state.orm)
        .await?;

    Ok(products
        .into_iter()
        .map(|product| (product.id, cart_service::entry_from_product(product)))
        .collect())
}

async fn verify_payment(
    state: &AppState,
    payment_id: Option<&str>,
    total_amount: Decimal,
) -> AppResult<Option<String>> {
    let payment_id = payment_id.map(str::trim).filter(|id| !id.is_empty());
    let Some(payment_id) = payment_id else {
        if state.config.require_payment {
            return Err(AppError::PaymentRequired(
                "Payment is required to complete checkout".into(),
            ));
        }
        return Ok(None);
    };

    let capture = state.payments.verify_capture(payment_id).await?;
    if !capture.covers(total_amount) {
        tracing::warn!(
            payment_id,
            status = %capture.status,
            amount = %capture.amount,
            expected = %total_amount,
            "payment does not cover order"
        );
        return Err(AppError::PaymentRequired(
            "Payment was not completed for the order total".into(),
        ));
    }
    Ok(Some(capture.id))
}

async fn recipient_for(state: &AppState, user: &AuthUser, user_id: &str) -> AppResult<Option<String>> {
    let stored = Users::find_by_id(user_id.to_string())
        .one(&state.orm)
        .await?
        .map(|u| u.email);
    Ok(stored.or_else(|| user.email.clone()))
}

async fn persist(
    state: &AppState,
    user_id: &str,
    drafts: &[OrderDraft],
    total_amount: Decimal,
    payment_reference: Option<String>,
    recipient: Option<String>,
) -> AppResult<(Vec<Order>, Option<uuid::Uuid>)> {
    let txn = state.orm.begin().await?;

    if let Some(reference) = payment_reference.as_deref() {
        claim_payment(&txn, reference, user_id, total_amount).await?;
    }

    let rows = drafts.iter().map(|draft| OrderActive {
        id: NotSet,
        user_id: Set(user_id.to_string()),
        product_id: Set(draft.product_id),
        title: Set(draft.title.clone()),
        price: Set(draft.price),
        category: Set(draft.category.clone()),
        image_url: Set(draft.image_url.clone()),
        product_url: Set(draft.product_url.clone()),
        quantity: Set(draft.quantity),
        total_price: Set(draft.total_price),
        payment_reference: Set(payment_reference.clone()),
        created_at: NotSet,
        updated_at: NotSet,
    });
    let inserted = Orders::insert_many(rows)
        .exec_with_returning_many(&txn)
        .await?;

    Cart::delete_many()
        .filter(CartCol::UserId.eq(user_id))
        .exec(&txn)
        .await?;

    let outbox_id = match recipient {
        Some(to) => {
            let email = render_receipt(&ReceiptInput {
                lines: drafts,
                total_amount,
                store_url: state.config.app_url.as_deref(),
            });
            let message = EmailMessage {
                to,
                subject: email.subject,
                html: email.html,
                text: email.text,
            };
            Some(outbox::enqueue(&txn, Some(user_id), &message).await?)
        }
        None => None,
    };

    txn.commit().await?;

    Ok((inserted.into_iter().map(order_from_entity).collect(), outbox_id))
}

/// Mark a capture as spent. Each capture pays for one checkout only; a
/// concurrent claim of the same reference waits on the primary key and then
/// finds it taken.
async fn claim_payment(
    txn: &DatabaseTransaction,
    reference: &str,
    user_id: &str,
    amount: Decimal,
) -> AppResult<()> {
    let claim = ClaimActive {
        payment_reference: Set(reference.to_string()),
        user_id: Set(user_id.to_string()),
        amount: Set(amount),
        created_at: NotSet,
    };
    let inserted = PaymentClaims::insert(claim)
        .on_conflict_do_nothing()
        .exec_without_returning(txn)
        .await?;

    match inserted {
        TryInsertResult::Inserted(rows) if rows > 0 => Ok(()),
        _ => {
            tracing::warn!(payment_reference = reference, user_id, "payment already used");
            Err(AppError::PaymentRequired("Payment has already been used".into()))
        }
    }
}

pub fn order_from_entity(model: OrderModel) -> Order {
    Order {
        id: model.id,
        user_id: model.user_id,
        product_id: model.product_id,
        title: model.title,
        price: model.price,
        category: model.category,
        image_url: model.image_url,
        product_url: model.product_url,
        quantity: model.quantity,
        total_price: model.total_price,
        created_at: model.created_at,
    }
}
