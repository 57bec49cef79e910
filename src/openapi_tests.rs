use crate::schemas::ApiDoc;
use utoipa::OpenApi;

#[test]
fn test_openapi_schema_generation() {
    let openapi = ApiDoc::openapi();

    assert!(openapi.components.is_some());
    let components = openapi.components.as_ref().unwrap();

    assert!(components.schemas.contains_key("ErrorResponse"));
    assert!(components.schemas.contains_key("HealthResponse"));
    assert!(components.schemas.contains_key("MangoResponse"));
    assert!(components.schemas.contains_key("CreateMangoRequest"));
    assert!(components.security_schemes.contains_key("token"));

    let json_result = serde_json::to_string(&openapi);
    assert!(json_result.is_ok());
}

#[test]
fn test_openapi_documents_every_route() {
    let openapi = ApiDoc::openapi();
    let paths = &openapi.paths.paths;

    for path in [
        "/health",
        "/mangos/",
        "/mangos/{mango_id}/",
        "/sign-up/",
        "/sign-in/",
        "/sign-out/",
        "/change-pw/",
    ] {
        assert!(paths.contains_key(path), "missing path {}", path);
    }
}

#[test]
fn test_error_response_schema_structure() {
    let openapi = ApiDoc::openapi();
    let components = openapi.components.as_ref().unwrap();
    let error_response_schema = components.schemas.get("ErrorResponse").unwrap();

    if let utoipa::openapi::RefOr::T(utoipa::openapi::schema::Schema::Object(obj)) =
        error_response_schema
    {
        let properties = &obj.properties;
        assert!(properties.contains_key("error"));
        assert!(properties.contains_key("code"));
        assert!(properties.contains_key("success"));
        assert!(properties.contains_key("fields"));
    } else {
        panic!("ErrorResponse should be an object schema");
    }
}

#[test]
fn test_mango_response_schema_structure() {
    let openapi = ApiDoc::openapi();
    let components = openapi.components.as_ref().unwrap();
    let mango_schema = components.schemas.get("MangoResponse").unwrap();

    if let utoipa::openapi::RefOr::T(utoipa::openapi::schema::Schema::Object(obj)) = mango_schema {
        for field in ["id", "name", "color", "ripe", "created_at", "updated_at"] {
            assert!(obj.properties.contains_key(field), "missing field {}", field);
        }
    } else {
        panic!("MangoResponse should be an object schema");
    }
}
