mod common;

use common::fixtures::holder;
use common::{TestResult, holder_context};
use objpath::{PathContext, Value, XPathError};

#[test]
fn test_set_value_on_existing_properties() -> TestResult {
    let _ = env_logger::builder().is_test(true).try_init();
    let context = holder_context();
    context.set_value("name", "first holder")?;
    assert_eq!(context.get_value("name")?, Value::from("first holder"));

    context.set_value("bag/existing", "replaced")?;
    assert_eq!(context.get_value("bag/existing")?, Value::from("replaced"));
    context.set_value("bag/added", 4)?;
    assert_eq!(context.get_value("bag/added")?, Value::from(4));
    Ok(())
}

#[test]
fn test_create_path_builds_missing_beans() -> TestResult {
    let context = holder_context();
    assert_eq!(context.get_pointer("child/child")?.signature(), "BbNn");

    let created = context.create_path("child/child")?;
    assert_eq!(created.as_path(), "/child/child");
    assert_eq!(context.get_pointer("child/child")?.signature(), "BbBb");
    assert_eq!(context.get_value("child/child/name")?, Value::Null);
    Ok(())
}

#[test]
fn test_create_path_expands_collections() -> TestResult {
    let context = holder_context();
    assert_eq!(context.get_pointer("items[2]")?.signature(), "BbE");

    context.create_path("items[2]")?;
    assert_eq!(context.evaluate("count(items)")?.to_number(), 2.0);
    assert_eq!(context.get_value("items[1]")?, Value::Null);
    assert_eq!(context.get_value("items[2]/name")?, Value::Null);

    context.create_path_and_set_value("items[4]", "fourth")?;
    assert_eq!(context.evaluate("count(items)")?.to_number(), 4.0);
    assert_eq!(context.get_value("items[4]")?, Value::from("fourth"));
    Ok(())
}

#[test]
fn test_create_path_and_set_value_adds_map_keys() -> TestResult {
    let context = holder_context();
    let pointer = context.create_path_and_set_value("bag/newKey", 5)?;
    assert_eq!(pointer.as_path(), "/bag[@name='newKey']");
    assert_eq!(context.get_value("bag/newKey")?, Value::from(5));
    assert_eq!(context.get_value("bag/existing")?, Value::from("here"));
    Ok(())
}

#[test]
fn test_remove_path_and_remove_all() -> TestResult {
    let context = holder_context();
    context.remove_path("bag/existing")?;
    assert!(!context.get_pointer("bag/existing")?.is_actual());

    for i in 1..=3 {
        context.create_path_and_set_value(&format!("items[{}]", i), i)?;
    }
    context.remove_path("items[2]")?;
    assert_eq!(context.iterate("items")?, vec![Value::from(1), Value::from(3)]);

    context.remove_all("items")?;
    assert_eq!(context.evaluate("count(items)")?.to_number(), 0.0);

    assert!(matches!(context.remove_path("bag/missing"), Err(XPathError::NotFound(_))));
    assert!(context.clone().with_lenient(true).remove_path("bag/missing").is_ok());
    Ok(())
}

#[test]
fn test_factory_declares_variables() -> TestResult {
    let context = holder_context();
    context.create_path_and_set_value("$fresh", 3)?;
    assert_eq!(context.get_value("$fresh")?, Value::from(3));

    context.create_path("$items")?;
    assert_eq!(context.evaluate("count($items)")?.to_number(), 0.0);
    Ok(())
}

#[test]
fn test_creation_without_factory_fails() {
    let context = PathContext::new(holder());
    assert!(matches!(
        context.create_path("child/child"),
        Err(XPathError::CannotCreatePath { .. })
    ));
    assert!(matches!(
        context.create_path("$fresh"),
        Err(XPathError::CannotCreatePath { .. })
    ));
    assert!(matches!(
        context.set_value("child/name", "x"),
        Err(XPathError::InvalidAccess { .. })
    ));
}
