//! OpenAPI document generated from the entity registry.

use crate::config::{EntityKind, EntitySchema, FieldDescriptor, FieldKind};
use std::sync::OnceLock;
use utoipa::openapi::content::ContentBuilder;
use utoipa::openapi::info::InfoBuilder;
use utoipa::openapi::path::{
    HttpMethod, Operation, OperationBuilder, ParameterBuilder, ParameterIn, PathItemBuilder, PathsBuilder,
};
use utoipa::openapi::request_body::RequestBodyBuilder;
use utoipa::openapi::response::ResponseBuilder;
use utoipa::openapi::schema::{
    Array, ComponentsBuilder, KnownFormat, ObjectBuilder, Ref, Schema, SchemaFormat, Type,
};
use utoipa::openapi::{OpenApi, OpenApiBuilder, RefOr, Required};

const JSON: &str = "application/json";

/// The document is immutable, so it is built once.
pub fn openapi() -> &'static OpenApi {
    static DOC: OnceLock<OpenApi> = OnceLock::new();
    DOC.get_or_init(build_openapi)
}

pub fn build_openapi() -> OpenApi {
    let mut components = ComponentsBuilder::new()
        .schema("Violation", violation_schema())
        .schema("ValidationFailure", validation_failure_schema())
        .schema("Failure", failure_schema())
        .schema("MutationEnvelope", envelope_schema());
    let mut paths = PathsBuilder::new();

    for kind in EntityKind::ALL {
        let schema = kind.schema();
        components = components
            .schema(schema.label, record_schema(schema.fields, |f| f.required))
            .schema(format!("{}Replace", schema.label), record_schema(schema.mutable_fields(), |_| true))
            .schema(format!("{}Patch", schema.label), record_schema(schema.mutable_fields(), |_| false));

        let collection = PathItemBuilder::new()
            .operation(HttpMethod::Get, list_operation(schema))
            .operation(
                HttpMethod::Post,
                mutation_operation(format!("Create a {}", schema.label.to_lowercase()), None, Some(schema.label.to_string())),
            )
            .build();
        let item = PathItemBuilder::new()
            .operation(
                HttpMethod::Put,
                mutation_operation(
                    format!("Replace every field of a {}", schema.label.to_lowercase()),
                    Some(schema),
                    Some(format!("{}Replace", schema.label)),
                ),
            )
            .operation(
                HttpMethod::Patch,
                mutation_operation(
                    format!("Update some fields of a {}", schema.label.to_lowercase()),
                    Some(schema),
                    Some(format!("{}Patch", schema.label)),
                ),
            )
            .operation(
                HttpMethod::Delete,
                mutation_operation(format!("Delete a {}", schema.label.to_lowercase()), Some(schema), None),
            )
            .build();
        paths = paths
            .path(format!("/{}", schema.path_segment), collection)
            .path(format!("/{}/{{key}}", schema.path_segment), item);
    }

    OpenApiBuilder::new()
        .info(
            InfoBuilder::new()
                .title("Sales API")
                .version(env!("CARGO_PKG_VERSION"))
                .description(Some("CRUD API for agents, companies, customers and orders"))
                .build(),
        )
        .paths(paths.build())
        .components(Some(components.build()))
        .build()
}

fn field_schema(f: &FieldDescriptor) -> RefOr<Schema> {
    let builder = ObjectBuilder::new().description(Some(f.description));
    let builder = match f.kind {
        FieldKind::String => builder.schema_type(Type::String),
        FieldKind::Integer => builder
            .schema_type(Type::Integer)
            .format(Some(SchemaFormat::KnownFormat(KnownFormat::Int64))),
        FieldKind::Float => builder
            .schema_type(Type::Number)
            .format(Some(SchemaFormat::KnownFormat(KnownFormat::Float))),
        FieldKind::Date => builder
            .schema_type(Type::String)
            .format(Some(SchemaFormat::KnownFormat(KnownFormat::Date))),
    };
    RefOr::T(Schema::Object(builder.build()))
}

fn record_schema(fields: &[FieldDescriptor], required: impl Fn(&FieldDescriptor) -> bool) -> RefOr<Schema> {
    let mut obj = ObjectBuilder::new().schema_type(Type::Object);
    for f in fields {
        obj = obj.property(f.name, field_schema(f));
        if required(f) {
            obj = obj.required(f.name);
        }
    }
    RefOr::T(Schema::Object(obj.build()))
}

fn scalar(ty: Type) -> RefOr<Schema> {
    RefOr::T(Schema::Object(ObjectBuilder::new().schema_type(ty).build()))
}

fn violation_schema() -> RefOr<Schema> {
    let obj = ObjectBuilder::new()
        .schema_type(Type::Object)
        .property("field", scalar(Type::String))
        .property("reason", scalar(Type::String))
        .property("value", RefOr::T(Schema::Object(ObjectBuilder::new().build())))
        .required("field")
        .required("reason");
    RefOr::T(Schema::Object(obj.build()))
}

fn validation_failure_schema() -> RefOr<Schema> {
    let obj = ObjectBuilder::new()
        .schema_type(Type::Object)
        .property("success", scalar(Type::Boolean))
        .property("message", scalar(Type::String))
        .property("errors", RefOr::T(Schema::Array(Array::new(Ref::from_schema_name("Violation")))));
    RefOr::T(Schema::Object(obj.build()))
}

fn failure_schema() -> RefOr<Schema> {
    let obj = ObjectBuilder::new()
        .schema_type(Type::Object)
        .property("success", scalar(Type::Boolean))
        .property("message", scalar(Type::String));
    RefOr::T(Schema::Object(obj.build()))
}

fn envelope_schema() -> RefOr<Schema> {
    let result = ObjectBuilder::new()
        .schema_type(Type::Object)
        .property("affectedRows", scalar(Type::Integer))
        .property("key", scalar(Type::String));
    let obj = ObjectBuilder::new()
        .schema_type(Type::Object)
        .property("success", scalar(Type::Boolean))
        .property("message", scalar(Type::String))
        .property("result", RefOr::T(Schema::Object(result.build())));
    RefOr::T(Schema::Object(obj.build()))
}

fn json_response(description: &str, schema: RefOr<Schema>) -> utoipa::openapi::Response {
    ResponseBuilder::new()
        .description(description)
        .content(JSON, ContentBuilder::new().schema(Some(schema)).build())
        .build()
}

fn component(name: &str) -> RefOr<Schema> {
    RefOr::Ref(Ref::from_schema_name(name))
}

fn list_operation(schema: &EntitySchema) -> Operation {
    OperationBuilder::new()
        .summary(Some(format!("Returns a list of {}", schema.path_segment)))
        .response(
            "200",
            json_response(
                &format!("A JSON array of {}", schema.path_segment),
                RefOr::T(Schema::Array(Array::new(component(schema.label)))),
            ),
        )
        .response("500", json_response("Store failure", component("Failure")))
        .build()
}

/// `keyed` adds the primary-key path parameter; `body` names the request body component.
fn mutation_operation(summary: String, keyed: Option<&EntitySchema>, body: Option<String>) -> Operation {
    let mut op = OperationBuilder::new().summary(Some(summary));
    if let Some(schema) = keyed {
        op = op.parameter(
            ParameterBuilder::new()
                .name("key")
                .parameter_in(ParameterIn::Path)
                .required(Required::True)
                .description(Some(schema.key().name))
                .schema(Some(scalar(Type::String)))
                .build(),
        );
    }
    if let Some(name) = body {
        op = op
            .request_body(Some(
                RequestBodyBuilder::new()
                    .content(JSON, ContentBuilder::new().schema(Some(component(&name))).build())
                    .required(Some(Required::True))
                    .build(),
            ))
            .response("400", json_response("Validation failed", component("ValidationFailure")));
    }
    op.response("200", json_response("Success envelope", component("MutationEnvelope")))
        .response("500", json_response("Store failure", component("Failure")))
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_route_is_documented() {
        let doc = serde_json::to_value(build_openapi()).unwrap();
        for kind in EntityKind::ALL {
            let schema = kind.schema();
            let collection = &doc["paths"][format!("/{}", schema.path_segment)];
            assert!(collection.get("get").is_some());
            assert!(collection.get("post").is_some());
            let item = &doc["paths"][format!("/{}/{{key}}", schema.path_segment)];
            for verb in ["put", "patch", "delete"] {
                assert!(item.get(verb).is_some(), "{} {}", verb, schema.path_segment);
            }
            assert!(doc["components"]["schemas"].get(schema.label).is_some());
        }
    }

    #[test]
    fn record_schemas_follow_registry_kinds() {
        let doc = serde_json::to_value(build_openapi()).unwrap();
        let agent = &doc["components"]["schemas"]["Agent"];
        assert_eq!(agent["properties"]["COMMISSION"]["type"], "number");
        assert_eq!(agent["required"], serde_json::json!(["AGENT_CODE", "AGENT_NAME"]));
        let order = &doc["components"]["schemas"]["Order"];
        assert_eq!(order["properties"]["ORD_DATE"]["format"], "date");
    }
}
