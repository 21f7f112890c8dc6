use utoipa::OpenApi;

use crate::api;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::health,
        api::fonts,
        api::preview,
        api::generate,
    ),
    components(schemas(api::HealthResponse)),
    tags(
        (name = "doortag", description = "Door tag generation API")
    )
)]
pub struct ApiDoc;
