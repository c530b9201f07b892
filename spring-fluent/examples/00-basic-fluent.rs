use spring_fluent::context::FluentApplicationContext;
use spring_fluent::instance_provider::ObjectPtr;
use spring_fluent::object_definition::AutowireMode;
use spring_fluent::{object_alias, Object};

// this is a trait we would like to inject into our service
trait Repository: Send + Sync {
    fn say_hello(&self) -> String;
}

// objects expose their fields as named properties, which can be set by the context; PascalCase
// makes "name" available as "Name"
#[derive(Object, Default)]
#[object(rename_all = "PascalCase")]
struct DefaultRepository {
    name: String,
}

// we're telling the framework DefaultRepository can be used wherever dyn Repository is needed
#[object_alias]
impl Repository for DefaultRepository {
    fn say_hello(&self) -> String {
        format!("Hello {}!", self.name)
    }
}

#[derive(Object, Default)]
#[object(rename_all = "PascalCase")]
struct Service {
    // reference properties can be autowired
    repository: Option<ObjectPtr<dyn Repository>>,
}

// note: for the sake of simplicity, errors are unwrapped, rather than gracefully handled
fn main() {
    let mut context = FluentApplicationContext::new();

    // "Repository" property will be set to the object named "Repository"
    context
        .register_object::<Service>("Service")
        .with_autowire_mode(AutowireMode::ByName);

    // property names are checked immediately - a typo results in an error here
    context
        .register_object::<DefaultRepository>("Repository")
        .add_property_value("Name", "Mathias")
        .expect("invalid property");

    // objects are created when the context gets refreshed
    context.refresh().expect("error refreshing context");

    let service = context
        .get_object::<Service>("Service")
        .expect("error getting Service");

    // prints "Hello Mathias!"
    if let Some(repository) = &service.repository {
        println!("{}", repository.say_hello());
    }
}
