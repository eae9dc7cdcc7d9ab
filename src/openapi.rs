use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "POS Sales API",
        version = "0.1.0",
        description = r#"
Sales service of the point-of-sale back-end.

Captures sales with per-line campaign discounts, orchestrates stock checks and
consumption against the inventory service, and processes returns within the
configured return window.

All endpoints require a capability token issued by the auth service:

```
Authorization: Bearer <token>
```

Failures share one error body: `{timestamp, status, error, message, path, subErrors?}`.
        "#,
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "Sales", description = "Sale capture and lookup"),
        (name = "Returns", description = "Return processing"),
        (name = "Campaigns", description = "Discount campaign administration")
    ),
    paths(
        crate::handlers::sales::create_sale,
        crate::handlers::sales::list_sales,
        crate::handlers::sales::get_sale,
        crate::handlers::sales::delete_sale,
        crate::handlers::returns::process_returns,
        crate::handlers::campaigns::create_campaign,
        crate::handlers::campaigns::list_campaigns,
        crate::handlers::campaigns::get_campaign,
        crate::handlers::campaigns::update_campaign,
        crate::handlers::campaigns::delete_campaign,
    ),
    components(schemas(
        crate::entities::campaign::CampaignKind,
        crate::entities::sale::SalePaymentType,
        crate::entities::sale_item::PaymentType,
        crate::errors::ErrorResponse,
        crate::errors::FieldError,
    ))
)]
pub struct ApiDoc;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDoc::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}
