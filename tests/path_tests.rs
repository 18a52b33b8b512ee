mod common;

use common::fixtures::test_bean;
use common::{TestResult, bean_context, selected_paths, strings};
use objpath::{ModelError, PathContext, Record, Value, XPathError};

fn check_pointer(context: &PathContext, path: &str, expected_path: &str, signature: &str) -> TestResult {
    let pointer = context.get_pointer(path)?;
    assert_eq!(pointer.as_path(), expected_path, "path of {}", path);
    assert_eq!(pointer.signature(), signature, "signature of {}", path);
    Ok(())
}

#[test]
fn test_pointer_signatures_of_existing_locations() -> TestResult {
    let _ = env_logger::builder().is_test(true).try_init();
    let context = bean_context();
    check_pointer(&context, "/int", "/int", "Bb")?;
    check_pointer(&context, "/integers[2]", "/integers[2]", "Bb")?;
    check_pointer(&context, "/map/Key1", "/map[@name='Key1']", "BbDd")?;
    check_pointer(&context, "/map[@name='Key1']", "/map[@name='Key1']", "BbDd")?;
    check_pointer(&context, "/beans[2]/name", "/beans[2]/name", "BbBb")?;
    check_pointer(&context, "/beans/name", "/beans[1]/name", "BbBb")?;

    assert_eq!(context.get_pointer("/int")?.value_pointer()?.signature(), "BbB");
    assert_eq!(context.get_pointer("/map/Key2")?.value_pointer()?.signature(), "BbDdB");
    Ok(())
}

#[test]
fn test_pointer_signatures_of_absent_locations() -> TestResult {
    let context = bean_context();
    check_pointer(&context, "/foo", "/foo", "Bn")?;
    check_pointer(&context, "/map/foo", "/map[@name='foo']", "BbDd")?;
    check_pointer(&context, "/list[6]", "/list[6]", "BbE")?;
    check_pointer(&context, "/nestedBean/foo/bar", "/nestedBean/foo/bar", "BbBnNn")?;
    check_pointer(&context, "/object/foo", "/object/foo", "BbNn")?;
    Ok(())
}

#[test]
fn test_absent_path_reads_null_only_when_lenient() -> TestResult {
    let strict = bean_context();
    let pointer = strict.get_pointer("/nestedBean/foo")?;
    assert!(!pointer.is_actual());
    assert!(matches!(
        strict.get_value("/nestedBean/foo"),
        Err(XPathError::NotFound(path)) if path == "/nestedBean/foo"
    ));

    let lenient = bean_context().with_lenient(true);
    assert_eq!(lenient.get_value("/nestedBean/foo")?, Value::Null);
    assert_eq!(lenient.get_value("/map/foo")?, Value::Null);
    // A declared property holding null is not absent.
    assert_eq!(strict.get_value("/object")?, Value::Null);
    Ok(())
}

#[test]
fn test_reads_through_collections_and_maps() -> TestResult {
    let context = bean_context();
    assert_eq!(context.get_value("int")?, Value::from(1));
    assert_eq!(context.get_value("integers[3]")?, Value::from(3));
    assert_eq!(context.get_value("list[2]")?, Value::from(3));
    assert_eq!(context.get_value("map/Key1")?, Value::from("Value 1"));
    assert_eq!(context.get_value("map[@name='Key2']/name")?, Value::from("Name 6"));
    assert_eq!(context.get_value("beans[2]/int")?, Value::from(2));
    assert_eq!(context.get_value("nestedBean/strings[2]")?, Value::from("String 2"));
    Ok(())
}

#[test]
fn test_iteration_yields_every_element() -> TestResult {
    let context = bean_context();
    let integers: Vec<Value> = (1..=4).map(Value::from).collect();
    assert_eq!(context.iterate("/integers")?, integers);
    assert_eq!(context.iterate("/beans/name")?, strings(&["Name 1", "Name 2"]));
    assert_eq!(
        selected_paths(&context, "/beans/name")?,
        vec!["/beans[1]/name", "/beans[2]/name"]
    );
    assert!(context.iterate("/nothing")?.is_empty());

    let mut names: Vec<String> = context
        .iterate("//name")?
        .iter()
        .filter_map(|v| v.as_str().map(str::to_string))
        .collect();
    names.sort();
    assert_eq!(names, vec!["Name 0", "Name 1", "Name 2", "Name 6"]);
    Ok(())
}

#[test]
fn test_predicates_filter_and_select() -> TestResult {
    let context = bean_context();
    assert_eq!(context.iterate("/integers[. > 2]")?, vec![Value::from(3), Value::from(4)]);
    assert_eq!(context.iterate("/integers[position() < 3]")?, vec![Value::from(1), Value::from(2)]);
    assert_eq!(context.iterate("/integers[last()]")?, vec![Value::from(4)]);
    assert_eq!(context.iterate("/beans[int = 2]/name")?, strings(&["Name 2"]));
    assert_eq!(context.get_value("/beans[name = 'Name 1']/int")?, Value::from(1));
    Ok(())
}

#[test]
fn test_name_predicate_matches_name_function() -> TestResult {
    let context = bean_context();
    for key in ["Key1", "Key2"] {
        let by_attribute = context.select_pointers(&format!("map[@name='{}']", key))?;
        let by_function = context.select_pointers(&format!("map/*[name()='{}']", key))?;
        assert_eq!(by_attribute.len(), 1);
        assert_eq!(by_function.len(), 1);
        assert_eq!(by_attribute[0].value()?, by_function[0].value()?);
    }
    assert!(context.select_pointers("map[@name='missing']")?.is_empty());

    let by_attribute = context.get_pointer("map[@name='missing']")?;
    assert!(!by_attribute.is_actual());
    assert_eq!(by_attribute.as_path(), "/map[@name='missing']");
    let by_function = context.get_pointer("map/*[name()='missing']")?;
    assert!(!by_function.is_actual());
    assert_eq!(by_function.as_path(), "/map/*");
    Ok(())
}

#[test]
fn test_wildcard_counts_collection_elements() -> TestResult {
    let owner = Record::new("Owner")
        .with("a", 1)
        .with_collection("b", vec![10.into(), 20.into(), 30.into()])
        .with("c", "x");
    let context = PathContext::new(Value::object(Record::new("Wrapper").with("owner", Value::object(owner))));
    assert_eq!(context.evaluate("count(owner/*)")?.to_number(), 5.0);
    assert_eq!(
        selected_paths(&context, "owner/*")?,
        vec!["/owner/a", "/owner/b[1]", "/owner/b[2]", "/owner/b[3]", "/owner/c"]
    );
    Ok(())
}

#[test]
fn test_failing_accessor_is_skipped_by_iteration() -> TestResult {
    let bean = Record::new("Fragile")
        .with("a", 1)
        .with_failing("boom", "exploded")
        .with("c", 2);
    let context = PathContext::new(Value::object(bean));
    assert_eq!(context.iterate("*")?, vec![Value::from(1), Value::from(2)]);
    assert!(matches!(
        context.get_value("boom"),
        Err(XPathError::Model(ModelError::Accessor { .. }))
    ));
    Ok(())
}

#[test]
fn test_unions_are_sorted_and_deduplicated() -> TestResult {
    let context = bean_context();
    assert_eq!(selected_paths(&context, "int | boolean | int")?, vec!["/boolean", "/int"]);
    assert_eq!(context.evaluate("count(int | boolean | /int)")?.to_number(), 2.0);
    Ok(())
}

#[test]
fn test_variables() -> TestResult {
    let context = PathContext::new(test_bean())
        .with_variable("list", Value::list(vec!["a".into(), "b".into(), "c".into()]))
        .with_variable("bean", test_bean());
    assert_eq!(context.get_value("$list[2]")?, Value::from("b"));
    assert_eq!(context.get_pointer("$list[2]")?.as_path(), "$list[2]");
    assert_eq!(context.get_value("$bean/nestedBean/name")?, Value::from("Name 0"));
    assert_eq!(context.iterate("$list")?, strings(&["a", "b", "c"]));
    assert!(matches!(
        context.get_value("$nope"),
        Err(XPathError::UnknownVariable(name)) if name == "nope"
    ));

    context.variables().borrow_mut().insert("list".into(), Value::list(vec!["z".into()]));
    assert_eq!(context.get_value("$list[1]")?, Value::from("z"));
    Ok(())
}

#[test]
fn test_relative_context() -> TestResult {
    let context = bean_context();
    let second = context.get_pointer("beans[2]")?;
    let relative = context.relative(&second);
    assert_eq!(relative.get_value("name")?, Value::from("Name 2"));
    assert_eq!(relative.get_value("/int")?, Value::from(1));
    assert_eq!(relative.get_value("../int")?, Value::from(1));
    Ok(())
}

#[test]
fn test_parse_errors_are_reported() {
    let context = bean_context();
    assert!(matches!(context.get_value("/int["), Err(XPathError::XPathParse(..))));
    assert!(matches!(context.get_value("bogus(1)"), Err(XPathError::UnknownFunction(name)) if name == "bogus"));
}
