// note: this example assumes you've analyzed the previous one

use spring_fluent::context::FluentApplicationContext;
use spring_fluent::placeholder::{EnvironmentVariableSource, MapVariableSource};
use spring_fluent::Object;
use std::sync::Arc;

#[derive(Object, Default)]
#[object(rename_all = "PascalCase")]
struct Connection {
    url: String,
    user: String,
    timeout: u32,
}

fn main() {
    let mut context = FluentApplicationContext::new();

    // ${...} tokens are replaced when the context is refreshed; placeholders can be nested and
    // are converted to the property type afterwards
    context
        .register_object::<Connection>("Connection")
        .add_property_value("Url", "postgres://${host}:${port}/app")
        .and_then(|builder| builder.add_property_value("User", "${USER}"))
        .and_then(|builder| builder.add_property_value("Timeout", "${timeout}"))
        .expect("invalid property");

    // sources are asked in order of registration - the first one able to resolve a name wins
    context
        .add_variable_source(Arc::new(
            MapVariableSource::new()
                .with_variable("host", "localhost")
                .with_variable("port", "5432")
                .with_variable("timeout", "30"),
        ))
        .add_variable_source(Arc::new(EnvironmentVariableSource::new()));

    context.refresh().expect("error refreshing context");

    let connection = context
        .get_object::<Connection>("Connection")
        .expect("error getting Connection");

    println!(
        "Connecting to {} as {} (timeout: {}s)",
        connection.url, connection.user, connection.timeout
    );
}
