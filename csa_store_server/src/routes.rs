//! Request handler definitions
//!
//! Define each route and it handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests. Any long, non-cpu-bound operation (I/O, database calls, gateway
//! calls) must be expressed as a future or asynchronous function so the worker can run other requests concurrently.

use std::str::FromStr;

use actix_web::{get, web, HttpResponse, Responder};
use chrono::{NaiveDate, Utc};
use csa_store_engine::{
    db_types::{MemberProfile, PaymentMethod},
    traits::{
        BudgetLedger,
        CartManagement,
        CatalogManagement,
        DiscountManagement,
        MemberError,
        MemberManagement,
        OrderManagement,
        PaymentGatewayDatabase,
    },
    CartApi,
    CatalogApi,
    LedgerApi,
    OrderCloseApi,
    PaymentApi,
    ReportApi,
};
use log::*;
use serde_json::json;
use signrequest_tools::{verify_event, SignRequestApi, SignRequestEvent};
use stripe_tools::GatewayEvent;

use crate::{
    auth::{Role, TokenClaims},
    data_objects::{
        AddToCartRequest,
        AgreementRequest,
        AvailabilityRequest,
        BudgetResponse,
        CartResponse,
        ChargeRequest,
        CreditRequest,
        DinnerRequest,
        DiscountRequest,
        JsonResponse,
        SetQuantityRequest,
        StockUpdateRequest,
        SubscribeRequest,
        UpdateAmountRequest,
        UpdateProfileRequest,
        UpdateSourceRequest,
        VerifyAchRequest,
    },
    errors::ServerError,
    integrations::{gateway::PaymentService, mailer::ListSync},
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal requires [$($roles:expr),+]) => {
        paste::paste! { pub struct [<$name:camel Route>];}
        paste::paste! {
                impl [<$name:camel Route>] {
                #[allow(clippy::new_without_default)]
                pub fn new() -> Self { Self }
            }
        }
        paste::paste! {
            impl actix_web::dev::HttpServiceFactory for [<$name:camel Route>] {
                fn register(self, config: &mut actix_web::dev::AppService) {
                    let res = actix_web::Resource::new($path)
                        .name(stringify!($name))
                        .guard(actix_web::guard::$method())
                        .to($name)
                        .wrap($crate::middleware::AclMiddlewareFactory::new(&[$($roles),+]));
                    actix_web::dev::HttpServiceFactory::register(res, config);
                }
            }
        }
    };

    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]<A>(core::marker::PhantomData<fn() -> A>);}
        paste::paste! { impl<A> [<$name:camel Route>]<A> {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self(core::marker::PhantomData::<fn() -> A>)
            }
        }}
        paste::paste! { impl<A> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<A>
        where
            A: $($bounds +)+ 'static,
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::<A>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };

    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+ where requires [$($roles:expr),+])  => {
        paste::paste! { pub struct [<$name:camel Route>]<A>(core::marker::PhantomData<fn() -> A>);}
        paste::paste! { impl<A> [<$name:camel Route>]<A> {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self(core::marker::PhantomData::<fn() -> A>)
            }
        }}
        paste::paste! { impl<A> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<A>
        where
            A: $($bounds +)+ 'static,
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::<A>)
                    .wrap($crate::middleware::AclMiddlewareFactory::new(&[$($roles),+]));
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Cart  ----------------------------------------------------

route!(cart => Get "/cart" impl CartManagement, CatalogManagement, MemberManagement, DiscountManagement, BudgetLedger);
/// The member's live cart with its totals.
pub async fn cart<B>(
    claims: web::ReqData<TokenClaims>,
    api: web::Data<CartApi<B>>,
) -> Result<HttpResponse, ServerError>
where B: CartManagement + CatalogManagement + MemberManagement + DiscountManagement + BudgetLedger {
    let summary = api.cart_summary(claims.user_id).await?;
    Ok(HttpResponse::Ok().json(CartResponse::from(summary)))
}

route!(add_to_cart => Post "/cart" impl CartManagement, CatalogManagement, MemberManagement, DiscountManagement, BudgetLedger);
/// Add a variation to the cart. Runs the full ordering gate: agreement, window, stock and budget.
pub async fn add_to_cart<B>(
    claims: web::ReqData<TokenClaims>,
    api: web::Data<CartApi<B>>,
    body: web::Json<AddToCartRequest>,
) -> Result<HttpResponse, ServerError>
where B: CartManagement + CatalogManagement + MemberManagement + DiscountManagement + BudgetLedger {
    let AddToCartRequest { variation_id, quantity } = body.into_inner();
    debug!("🛒️ User {} adding {quantity} of variation {variation_id}", claims.user_id);
    let item = api.add_to_cart(claims.user_id, variation_id, quantity).await?;
    Ok(HttpResponse::Ok().json(item))
}

route!(set_quantity => Put "/cart" impl CartManagement, CatalogManagement, MemberManagement, DiscountManagement, BudgetLedger);
pub async fn set_quantity<B>(
    claims: web::ReqData<TokenClaims>,
    api: web::Data<CartApi<B>>,
    body: web::Json<SetQuantityRequest>,
) -> Result<HttpResponse, ServerError>
where B: CartManagement + CatalogManagement + MemberManagement + DiscountManagement + BudgetLedger {
    let SetQuantityRequest { cart_item_id, quantity } = body.into_inner();
    api.set_quantity(claims.user_id, cart_item_id, quantity).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::success("Quantity updated")))
}

route!(clear_cart => Delete "/cart" impl CartManagement, CatalogManagement, MemberManagement, DiscountManagement, BudgetLedger);
pub async fn clear_cart<B>(
    claims: web::ReqData<TokenClaims>,
    api: web::Data<CartApi<B>>,
) -> Result<HttpResponse, ServerError>
where B: CartManagement + CatalogManagement + MemberManagement + DiscountManagement + BudgetLedger {
    api.clear_cart(claims.user_id).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::success("Cart cleared")))
}

route!(set_dinner => Post "/cart/dinner" impl CartManagement, CatalogManagement, MemberManagement, DiscountManagement, BudgetLedger);
/// How many people the member is bringing to the farm dinner this cycle.
pub async fn set_dinner<B>(
    claims: web::ReqData<TokenClaims>,
    api: web::Data<CartApi<B>>,
    body: web::Json<DinnerRequest>,
) -> Result<HttpResponse, ServerError>
where B: CartManagement + CatalogManagement + MemberManagement + DiscountManagement + BudgetLedger {
    api.set_attending_dinner(claims.user_id, body.count).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::success("Dinner attendance updated")))
}

route!(apply_discount => Post "/cart/discount" impl CartManagement, CatalogManagement, MemberManagement, DiscountManagement, BudgetLedger);
pub async fn apply_discount<B>(
    claims: web::ReqData<TokenClaims>,
    api: web::Data<CartApi<B>>,
    body: web::Json<DiscountRequest>,
) -> Result<HttpResponse, ServerError>
where B: CartManagement + CatalogManagement + MemberManagement + DiscountManagement + BudgetLedger {
    let discount = api.apply_discount_code(claims.user_id, &body.code).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::success(format!("Discount {} applied", discount.code.code))))
}

route!(remove_discount => Delete "/cart/discount" impl CartManagement, CatalogManagement, MemberManagement, DiscountManagement, BudgetLedger);
pub async fn remove_discount<B>(
    claims: web::ReqData<TokenClaims>,
    api: web::Data<CartApi<B>>,
) -> Result<HttpResponse, ServerError>
where B: CartManagement + CatalogManagement + MemberManagement + DiscountManagement + BudgetLedger {
    api.remove_discount_code(claims.user_id).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::success("Discount removed")))
}

//----------------------------------------------   Budget  ----------------------------------------------------

route!(budget => Get "/budget" impl BudgetLedger, CartManagement);
/// The member's budget: settled payments, spent orders, and what is left after the live cart.
pub async fn budget<B>(
    claims: web::ReqData<TokenClaims>,
    api: web::Data<LedgerApi<B>>,
) -> Result<HttpResponse, ServerError>
where B: BudgetLedger + CartManagement {
    let user_id = claims.user_id;
    let payments_total = api.payments_total(user_id).await?;
    let orders_total = api.orders_total(user_id).await?;
    let remaining = api.remaining_budget(user_id).await?;
    Ok(HttpResponse::Ok().json(BudgetResponse { payments_total, orders_total, remaining }))
}

//----------------------------------------------   Profile  ----------------------------------------------------

route!(my_profile => Get "/profile" impl MemberManagement);
pub async fn my_profile<B>(
    claims: web::ReqData<TokenClaims>,
    api: web::Data<MemberApi<B>>,
) -> Result<HttpResponse, ServerError>
where B: MemberManagement {
    let profile = api
        .fetch_profile(claims.user_id)
        .await?
        .ok_or_else(|| ServerError::NoRecordFound(format!("Member profile {}", claims.user_id)))?;
    Ok(HttpResponse::Ok().json(profile))
}

route!(update_profile => Put "/profile" impl MemberManagement);
/// Apply the member's own profile changes. A drop-site change resyncs their mailing lists.
pub async fn update_profile<B>(
    claims: web::ReqData<TokenClaims>,
    api: web::Data<MemberApi<B>>,
    sync: web::Data<ListSync>,
    body: web::Json<UpdateProfileRequest>,
) -> Result<HttpResponse, ServerError>
where B: MemberManagement {
    let user_id = claims.user_id;
    let mut profile = api
        .fetch_profile(user_id)
        .await?
        .ok_or_else(|| ServerError::NoRecordFound(format!("Member profile {user_id}")))?;
    let old_drop_site = profile.drop_site.clone();
    let patch = body.into_inner();
    if let Some(phone) = patch.phone {
        profile.phone = Some(phone);
    }
    if let Some(drop_site) = patch.drop_site {
        profile.drop_site = if drop_site.is_empty() { None } else { Some(drop_site) };
    }
    if let Some(home_delivery) = patch.home_delivery {
        profile.home_delivery = home_delivery;
    }
    if let Some(address) = patch.delivery_address {
        profile.delivery_address = Some(address);
    }
    if let Some(city) = patch.delivery_city {
        profile.delivery_city = Some(city);
    }
    if let Some(zip) = patch.delivery_zip {
        profile.delivery_zip = Some(zip);
    }
    if let Some(instructions) = patch.delivery_instructions {
        profile.delivery_instructions = Some(instructions);
    }
    if let Some(subs) = patch.allow_substitutions {
        profile.allow_substitutions = subs;
    }
    if let Some(bags) = patch.no_plastic_bags {
        profile.no_plastic_bags = bags;
    }
    if let Some(weekly) = patch.weekly_email {
        profile.weekly_email = weekly;
    }
    let profile = api.upsert_profile(profile).await?;
    if profile.drop_site != old_drop_site {
        if let Err(e) = sync.sync_member(&profile).await {
            warn!("✉️ Could not resync mailing lists for user {user_id}. {e}");
        }
    }
    Ok(HttpResponse::Ok().json(profile))
}

//----------------------------------------------   Payments  ----------------------------------------------------

route!(my_payments => Get "/payments" impl PaymentGatewayDatabase, MemberManagement);
pub async fn my_payments<B>(
    claims: web::ReqData<TokenClaims>,
    api: web::Data<PaymentApi<B>>,
) -> Result<HttpResponse, ServerError>
where B: PaymentGatewayDatabase + MemberManagement {
    let payments = api.payments_for_user(claims.user_id).await?;
    Ok(HttpResponse::Ok().json(payments))
}

route!(subscribe => Post "/payment/subscription" impl MemberManagement, PaymentGatewayDatabase);
/// Start a monthly contribution with a tokenized card or bank account.
pub async fn subscribe<B>(
    claims: web::ReqData<TokenClaims>,
    service: web::Data<PaymentService<B>>,
    body: web::Json<SubscribeRequest>,
) -> Result<HttpResponse, ServerError>
where B: MemberManagement + PaymentGatewayDatabase {
    let SubscribeRequest { source_token, amount, payment_method } = body.into_inner();
    let method = PaymentMethod::from_str(&payment_method)
        .map_err(|e| ServerError::InvalidRequestBody(e.to_string()))?;
    match service.subscribe(claims.user_id, &source_token, amount, method).await? {
        Some(subscription) => Ok(HttpResponse::Ok().json(subscription)),
        None => Ok(HttpResponse::Ok()
            .json(JsonResponse::success("Contribution recorded. Verify the micro-deposits to start billing."))),
    }
}

route!(update_amount => Put "/payment/amount" impl MemberManagement, PaymentGatewayDatabase);
pub async fn update_amount<B>(
    claims: web::ReqData<TokenClaims>,
    service: web::Data<PaymentService<B>>,
    body: web::Json<UpdateAmountRequest>,
) -> Result<HttpResponse, ServerError>
where B: MemberManagement + PaymentGatewayDatabase {
    let subscription = service.update_amount(claims.user_id, body.amount).await?;
    Ok(HttpResponse::Ok().json(subscription))
}

route!(update_source => Put "/payment/source" impl MemberManagement, PaymentGatewayDatabase);
pub async fn update_source<B>(
    claims: web::ReqData<TokenClaims>,
    service: web::Data<PaymentService<B>>,
    body: web::Json<UpdateSourceRequest>,
) -> Result<HttpResponse, ServerError>
where B: MemberManagement + PaymentGatewayDatabase {
    service.update_source(claims.user_id, &body.source_token).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::success("Payment source updated")))
}

route!(pay_once => Post "/payment/charge" impl MemberManagement, PaymentGatewayDatabase);
/// A one-off top-up outside the monthly subscription.
pub async fn pay_once<B>(
    claims: web::ReqData<TokenClaims>,
    service: web::Data<PaymentService<B>>,
    body: web::Json<ChargeRequest>,
) -> Result<HttpResponse, ServerError>
where B: MemberManagement + PaymentGatewayDatabase {
    let ChargeRequest { amount, description } = body.into_inner();
    let charge = service.pay_once(claims.user_id, amount, &description).await?;
    Ok(HttpResponse::Ok().json(charge))
}

route!(verify_ach => Post "/payment/verify" impl MemberManagement, PaymentGatewayDatabase);
/// Confirm the two micro-deposit amounts for ACH verification.
pub async fn verify_ach<B>(
    claims: web::ReqData<TokenClaims>,
    service: web::Data<PaymentService<B>>,
    body: web::Json<VerifyAchRequest>,
) -> Result<HttpResponse, ServerError>
where B: MemberManagement + PaymentGatewayDatabase {
    let status = service.verify_ach(claims.user_id, body.amounts).await?;
    Ok(HttpResponse::Ok().json(json!({ "ach_status": status })))
}

route!(cancel_subscription => Delete "/payment/subscription" impl MemberManagement, PaymentGatewayDatabase);
pub async fn cancel_subscription<B>(
    claims: web::ReqData<TokenClaims>,
    service: web::Data<PaymentService<B>>,
) -> Result<HttpResponse, ServerError>
where B: MemberManagement + PaymentGatewayDatabase {
    service.cancel_subscription(claims.user_id).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::success("Subscription canceled")))
}

//----------------------------------------------   Catalog  ----------------------------------------------------

route!(product_by_sku => Get "/product/{sku}" impl CatalogManagement, MemberManagement);
/// Public product lookup by SKU, used by the storefront's product pages.
pub async fn product_by_sku<B>(
    path: web::Path<String>,
    api: web::Data<CatalogApi<B>>,
) -> Result<HttpResponse, ServerError>
where B: CatalogManagement + MemberManagement {
    let sku = path.into_inner();
    let info = api
        .variation_by_sku(&sku)
        .await?
        .ok_or_else(|| ServerError::NoRecordFound(format!("No variation with SKU {sku}")))?;
    Ok(HttpResponse::Ok().json(info))
}

//----------------------------------------------   Webhooks  ----------------------------------------------------

route!(gateway_webhook => Post "" impl MemberManagement, PaymentGatewayDatabase);
/// Payment gateway events. The signature middleware has already verified the body, so processing errors
/// are acknowledged with a 200 and a failure message; the gateway must not retry them forever.
pub async fn gateway_webhook<B>(
    service: web::Data<PaymentService<B>>,
    body: web::Json<GatewayEvent>,
) -> Result<HttpResponse, ServerError>
where B: MemberManagement + PaymentGatewayDatabase {
    let event = body.into_inner();
    match service.handle_gateway_event(&event).await {
        Ok(message) => Ok(HttpResponse::Ok().json(JsonResponse::success(message))),
        Err(e) => {
            error!("🔔️ Could not process gateway event {}. {e}", event.id);
            Ok(HttpResponse::Ok().json(JsonResponse::failure(e)))
        },
    }
}

route!(signrequest_webhook => Post "" impl MemberManagement);
/// Membership agreement events from the signing service. The event hash is verified against the account
/// token; a `signed` event flips the member's agreement flag.
pub async fn signrequest_webhook<B>(
    api: web::Data<MemberApi<B>>,
    signer: web::Data<SignRequestApi>,
    body: web::Json<SignRequestEvent>,
) -> Result<HttpResponse, ServerError>
where B: MemberManagement {
    let event = body.into_inner();
    if let Err(e) = verify_event(&event, signer.api_token()) {
        warn!("🔐️ Rejected signing event: {e}");
        return Ok(HttpResponse::Forbidden().json(JsonResponse::failure("Invalid event hash")));
    }
    if event.event_type != "signed" {
        return Ok(HttpResponse::Ok().json(JsonResponse::success(format!("Ignored {}", event.event_type))));
    }
    let Some(email) = event.signer_email() else {
        warn!("🔔️ Signed event without a signer email");
        return Ok(HttpResponse::Ok().json(JsonResponse::failure("No signer email on event")));
    };
    match api.set_agreement_signed_by_email(email).await {
        Ok(Some(profile)) => {
            info!("🧾️ User {} signed the membership agreement", profile.user_id);
            Ok(HttpResponse::Ok().json(JsonResponse::success("Agreement recorded")))
        },
        Ok(None) => {
            warn!("🧾️ Agreement signed by unknown email {email}");
            Ok(HttpResponse::Ok().json(JsonResponse::failure("No member with that email")))
        },
        Err(e) => {
            error!("🧾️ Could not record agreement for {email}. {e}");
            Ok(HttpResponse::Ok().json(JsonResponse::failure(e)))
        },
    }
}

//----------------------------------------------   Admin  ----------------------------------------------------

route!(close_cycle => Post "/close" impl CartManagement, OrderManagement, CatalogManagement, MemberManagement, DiscountManagement where requires [Role::Admin]);
/// Close the ordering cycle now, outside the scheduled cutoff.
pub async fn close_cycle<B>(api: web::Data<OrderCloseApi<B>>) -> Result<HttpResponse, ServerError>
where B: CartManagement + OrderManagement + CatalogManagement + MemberManagement + DiscountManagement {
    let summary = api.close_cycle(Utc::now()).await?;
    Ok(HttpResponse::Ok().json(json!({
        "orders": summary.order_ids,
        "extra_order_id": summary.extra_order_id,
        "carts_cleared": summary.carts_cleared,
        "failures": summary.failures.iter().map(|f| format!("user {}: {}", f.user_id, f.reason)).collect::<Vec<_>>(),
    })))
}

route!(reports => Get "/reports/{date}" impl OrderManagement, CatalogManagement where requires [Role::Admin]);
/// The full weekly report bundle for a pickup date.
pub async fn reports<B>(
    path: web::Path<String>,
    api: web::Data<ReportApi<B>>,
) -> Result<HttpResponse, ServerError>
where B: OrderManagement + CatalogManagement {
    let date = NaiveDate::from_str(&path.into_inner())
        .map_err(|e| ServerError::InvalidRequestPath(format!("Bad date: {e}")))?;
    let report = api.weekly_report_for_date(date).await?;
    Ok(HttpResponse::Ok().json(json!({
        "date": date,
        "report": report,
    })))
}

route!(set_stock => Put "/stock" impl CatalogManagement, MemberManagement where requires [Role::Admin]);
/// Set a vendor's stock for a variation. Returns the cart reductions the change forced.
pub async fn set_stock<B>(
    api: web::Data<CatalogApi<B>>,
    body: web::Json<StockUpdateRequest>,
) -> Result<HttpResponse, ServerError>
where B: CatalogManagement + MemberManagement {
    let StockUpdateRequest { vendor_id, variation_id, num_in_stock, rank } = body.into_inner();
    let shortfalls = api.set_vendor_stock(variation_id, vendor_id, num_in_stock, rank).await?;
    Ok(HttpResponse::Ok().json(shortfalls))
}

route!(set_availability => Put "/availability" impl CatalogManagement, MemberManagement where requires [Role::Admin]);
/// Flip a product's availability. Withdrawing returns the cart items that were removed.
pub async fn set_availability<B>(
    api: web::Data<CatalogApi<B>>,
    body: web::Json<AvailabilityRequest>,
) -> Result<HttpResponse, ServerError>
where B: CatalogManagement + MemberManagement {
    let AvailabilityRequest { product_id, available } = body.into_inner();
    let removed = api.set_product_available(product_id, available).await?;
    Ok(HttpResponse::Ok().json(removed))
}

route!(issue_credit => Post "/credit" impl PaymentGatewayDatabase, MemberManagement where requires [Role::Admin]);
/// A manual ledger credit, outside the payment gateway.
pub async fn issue_credit<B>(
    api: web::Data<PaymentApi<B>>,
    body: web::Json<CreditRequest>,
) -> Result<HttpResponse, ServerError>
where B: PaymentGatewayDatabase + MemberManagement {
    let CreditRequest { user_id, amount, notes } = body.into_inner();
    let payment = api.issue_credit(user_id, amount, notes.as_deref().unwrap_or("Manual credit"), Utc::now()).await?;
    Ok(HttpResponse::Ok().json(payment))
}

route!(send_agreement => Post "/agreements" requires [Role::Admin]);
/// Send the membership agreement to a prospective member for signature.
pub async fn send_agreement(
    signer: web::Data<SignRequestApi>,
    body: web::Json<AgreementRequest>,
) -> Result<HttpResponse, ServerError> {
    let AgreementRequest { email, name } = body.into_inner();
    let request = signer.send_agreement(&email, &name).await?;
    Ok(HttpResponse::Ok().json(request))
}

/// Thin wrapper so member-profile handlers can share one `web::Data` registration.
pub struct MemberApi<B> {
    db: B,
}

impl<B> MemberApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

impl<B> MemberApi<B>
where B: MemberManagement
{
    pub async fn fetch_profile(&self, user_id: i64) -> Result<Option<MemberProfile>, MemberError> {
        self.db.fetch_profile(user_id).await
    }

    pub async fn upsert_profile(&self, profile: MemberProfile) -> Result<MemberProfile, MemberError> {
        self.db.upsert_profile(profile).await
    }

    pub async fn set_agreement_signed_by_email(&self, email: &str) -> Result<Option<MemberProfile>, MemberError> {
        self.db.set_agreement_signed_by_email(email).await
    }
}
