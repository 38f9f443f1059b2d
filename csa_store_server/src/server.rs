use std::time::Duration;

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use csa_store_engine::{
    events::EventProducers,
    CartApi,
    CatalogApi,
    LedgerApi,
    OrderCloseApi,
    PaymentApi,
    ReportApi,
    SqliteDatabase,
};
use log::info;
use sendinblue_tools::SendinblueApi;
use signrequest_tools::SignRequestApi;
use stripe_tools::StripeApi;

use crate::{
    config::ServerConfig,
    cycle_worker::start_cycle_worker,
    errors::ServerError,
    integrations::{
        gateway::PaymentService,
        mailer::{create_mailer_event_handlers, ListSync},
    },
    middleware::{AuthMiddlewareFactory, GatewaySignatureMiddlewareFactory},
    routes::{
        health,
        AddToCartRoute,
        ApplyDiscountRoute,
        BudgetRoute,
        CancelSubscriptionRoute,
        CartRoute,
        ClearCartRoute,
        CloseCycleRoute,
        GatewayWebhookRoute,
        IssueCreditRoute,
        MemberApi,
        MyPaymentsRoute,
        MyProfileRoute,
        PayOnceRoute,
        ProductBySkuRoute,
        RemoveDiscountRoute,
        ReportsRoute,
        SendAgreementRoute,
        SetAvailabilityRoute,
        SetDinnerRoute,
        SetQuantityRoute,
        SetStockRoute,
        SignrequestWebhookRoute,
        SubscribeRoute,
        UpdateAmountRoute,
        UpdateProfileRoute,
        UpdateSourceRoute,
        VerifyAchRoute,
    },
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let handlers = create_mailer_event_handlers(config.sendinblue.clone(), config.operator_alerts.clone())
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let producers = handlers.producers();
    tokio::spawn(handlers.start_handlers());
    let worker_mailer = SendinblueApi::new(config.sendinblue.clone())
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    start_cycle_worker(
        db.clone(),
        config.order_windows.clone(),
        config.delivery_fees.clone(),
        config.report_settings.clone(),
        producers.clone(),
        Some(worker_mailer),
        config.operator_alerts.clone(),
    );
    let srv = create_server_instance(config, db, producers)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    producers: EventProducers,
) -> Result<Server, ServerError> {
    let stripe = StripeApi::new(config.stripe.clone()).map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let signer =
        SignRequestApi::new(config.signrequest.clone()).map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let mailer =
        SendinblueApi::new(config.sendinblue.clone()).map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let list_sync = ListSync::new(mailer, config.mail_lists.clone());
    info!("💻️ Starting server workers");
    let srv = HttpServer::new(move || {
        let cart_api = CartApi::new(
            db.clone(),
            config.order_windows.clone(),
            config.delivery_fees.clone(),
            producers.clone(),
        );
        let ledger_api = LedgerApi::new(db.clone());
        let catalog_api = CatalogApi::new(db.clone(), producers.clone());
        let payment_api = PaymentApi::new(db.clone(), producers.clone());
        let member_api = MemberApi::new(db.clone());
        let close_api = OrderCloseApi::new(db.clone(), config.delivery_fees.clone(), producers.clone());
        let report_api = ReportApi::new(db.clone(), config.report_settings.clone());
        let payment_service =
            PaymentService::new(stripe.clone(), db.clone(), producers.clone(), config.payment_fees);
        let app = App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("csa::access_log"))
            .app_data(web::Data::new(cart_api))
            .app_data(web::Data::new(ledger_api))
            .app_data(web::Data::new(catalog_api))
            .app_data(web::Data::new(payment_api))
            .app_data(web::Data::new(member_api))
            .app_data(web::Data::new(close_api))
            .app_data(web::Data::new(report_api))
            .app_data(web::Data::new(payment_service))
            .app_data(web::Data::new(signer.clone()))
            .app_data(web::Data::new(list_sync.clone()));
        // Routes that require an access token
        let api_scope = web::scope("/api")
            .wrap(AuthMiddlewareFactory::new(config.auth.api_secret.clone()))
            .service(CartRoute::<SqliteDatabase>::new())
            .service(AddToCartRoute::<SqliteDatabase>::new())
            .service(SetQuantityRoute::<SqliteDatabase>::new())
            .service(ClearCartRoute::<SqliteDatabase>::new())
            .service(SetDinnerRoute::<SqliteDatabase>::new())
            .service(ApplyDiscountRoute::<SqliteDatabase>::new())
            .service(RemoveDiscountRoute::<SqliteDatabase>::new())
            .service(BudgetRoute::<SqliteDatabase>::new())
            .service(MyProfileRoute::<SqliteDatabase>::new())
            .service(UpdateProfileRoute::<SqliteDatabase>::new())
            .service(MyPaymentsRoute::<SqliteDatabase>::new())
            .service(SubscribeRoute::<SqliteDatabase>::new())
            .service(UpdateAmountRoute::<SqliteDatabase>::new())
            .service(UpdateSourceRoute::<SqliteDatabase>::new())
            .service(PayOnceRoute::<SqliteDatabase>::new())
            .service(VerifyAchRoute::<SqliteDatabase>::new())
            .service(CancelSubscriptionRoute::<SqliteDatabase>::new())
            .service(CloseCycleRoute::<SqliteDatabase>::new())
            .service(ReportsRoute::<SqliteDatabase>::new())
            .service(SetStockRoute::<SqliteDatabase>::new())
            .service(SetAvailabilityRoute::<SqliteDatabase>::new())
            .service(IssueCreditRoute::<SqliteDatabase>::new())
            .service(SendAgreementRoute::new());
        // The gateway signs its webhook bodies; the signing service signs inside the event payload.
        let gateway_scope = web::scope("/webhook/gateway")
            .wrap(GatewaySignatureMiddlewareFactory::new(
                config.stripe.webhook_secret.clone(),
                config.gateway_webhook_checks,
            ))
            .service(GatewayWebhookRoute::<SqliteDatabase>::new());
        let signrequest_scope =
            web::scope("/webhook/signrequest").service(SignrequestWebhookRoute::<SqliteDatabase>::new());
        app.service(health)
            .service(ProductBySkuRoute::<SqliteDatabase>::new())
            .service(api_scope)
            .service(gateway_scope)
            .service(signrequest_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}
