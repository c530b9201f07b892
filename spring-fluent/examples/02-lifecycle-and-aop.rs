// note: this example assumes you've analyzed the previous ones

use spring_fluent::aop::{AutoProxyCreator, NamePointcut};
use spring_fluent::context::FluentApplicationContext;
use spring_fluent::instance_provider::ObjectPtr;
use spring_fluent::{object_alias, Object};
use std::sync::Arc;

trait Greeter: Send + Sync {
    fn greet(&self) -> String;
}

#[derive(Object, Default)]
struct DefaultGreeter {
    greeting: String,
}

#[object_alias]
impl Greeter for DefaultGreeter {
    fn greet(&self) -> String {
        self.greeting.clone()
    }
}

// proxies implement the same trait as their target and decide when to delegate
struct LoggingGreeter(ObjectPtr<dyn Greeter>);

impl Greeter for LoggingGreeter {
    fn greet(&self) -> String {
        println!("Calling greet()");
        self.0.greet()
    }
}

fn main() {
    let mut context = FluentApplicationContext::new();

    // abstract definitions are never instantiated, but serve as templates for children
    context
        .register_object::<DefaultGreeter>("GreeterTemplate")
        .with_abstract(true)
        .add_property_value("greeting", "Hello")
        .expect("invalid property");

    context
        .register_child_object::<DefaultGreeter>("EnglishGreeter", "GreeterTemplate")
        .with_init_method(|greeter| {
            greeter.greeting.push_str(" world!");
            Ok(())
        })
        .with_destroy_method(|greeter| {
            println!("Destroying greeter: {}", greeter.greeting);
            Ok(())
        });

    context
        .register_child_object::<DefaultGreeter>("PolishGreeter", "GreeterTemplate")
        .add_property_value("greeting", "Witaj świecie!")
        .expect("invalid property")
        .add_post_process_before_initialization(|mut greeter| {
            greeter.greeting = greeter.greeting.to_uppercase();
            greeter
        });

    // objects with names starting with "Polish" get wrapped in a LoggingGreeter; proxies can only
    // be cast to dyn Greeter, so they are not combined with destroy methods here
    context.add_object_post_processor(Arc::new(AutoProxyCreator::<dyn Greeter>::new(
        NamePointcut::new(["Polish*"]).expect("invalid pattern"),
        |target| ObjectPtr::new(LoggingGreeter(target)) as ObjectPtr<dyn Greeter>,
    )));

    context.refresh().expect("error refreshing context");

    for name in context.object_names_for_type::<dyn Greeter>() {
        let greeter = context
            .get_object::<dyn Greeter>(&name)
            .expect("error getting greeter");
        println!("{name}: {}", greeter.greet());
    }

    // destroy methods run when the context is closed (or dropped)
    context.close();
}
