use indexmap::IndexMap;
use objpath::{ModelError, ObjectFactory, Record, Value};

/// A nested bean. Every `NestedBean` declares the same properties, since
/// bean descriptions are cached per type name.
pub fn nested_bean(name: &str, int: i32) -> Value {
    Value::object(
        Record::new("NestedBean")
            .with("name", name)
            .with("int", int)
            .with_collection("strings", vec!["String 1".into(), "String 2".into(), "String 3".into()]),
    )
}

/// The bean most path tests run against:
///
/// ```text
/// TestBean
///   boolean   false
///   int       1
///   integers  [1, 2, 3, 4]
///   list      ["String 3", 3, "String 4"]
///   map       {Key1: "Value 1", Key2: NestedBean "Name 6"}
///   nestedBean NestedBean "Name 0"
///   beans     [NestedBean "Name 1", NestedBean "Name 2"]
///   object    null
/// ```
pub fn test_bean() -> Value {
    let mut map = IndexMap::new();
    map.insert("Key1".to_string(), Value::from("Value 1"));
    map.insert("Key2".to_string(), nested_bean("Name 6", 6));
    Value::object(
        Record::new("TestBean")
            .with("boolean", false)
            .with("int", 1)
            .with_collection("integers", (1..=4).map(Value::from).collect())
            .with("list", Value::list(vec!["String 3".into(), 3.into(), "String 4".into()]))
            .with("map", Value::map(map))
            .with("nestedBean", nested_bean("Name 0", 0))
            .with_collection("beans", vec![nested_bean("Name 1", 1), nested_bean("Name 2", 2)])
            .with("object", Value::Null),
    )
}

/// A `Holder` bean with empty slots for path creation tests.
pub fn holder() -> Value {
    let mut bag = IndexMap::new();
    bag.insert("existing".to_string(), Value::from("here"));
    Value::object(
        Record::new("Holder")
            .with("name", Value::Null)
            .with("child", Value::Null)
            .with_collection("items", vec![])
            .with("bag", Value::map(bag)),
    )
}

pub const LIBRARY_XML: &str = r#"<library xml:lang="en">
  <book id="b1" year="1999">
    <title>First</title>
    <author>Ann</author>
  </book>
  <book id="b2" year="2005" xml:lang="de">
    <title>Zweites</title>
    <author>Bert</author>
    <author>Cleo</author>
  </book>
  <magazine id="m1">
    <title>Monthly</title>
  </magazine>
</library>"#;

/// Creates `Holder` children on demand: a bean for `child`, a map for
/// missing map keys, and collection elements for `items`.
#[derive(Debug, Default)]
pub struct HolderFactory;

impl ObjectFactory for HolderFactory {
    fn create_object(&self, parent: &Value, property: &str, index: usize) -> Result<bool, ModelError> {
        let created = match property {
            "child" | "items" => Value::object(
                Record::new("Holder")
                    .with("name", Value::Null)
                    .with("child", Value::Null)
                    .with_collection("items", vec![])
                    .with("bag", Value::Null),
            ),
            _ => Value::map(IndexMap::<String, Value>::new()),
        };
        match parent {
            Value::Object(bean) => {
                let current = bean.borrow().get(property)?;
                if current.is_collection() {
                    current.set_element(index, created)?;
                } else {
                    bean.borrow_mut().set(property, created)?;
                }
            }
            Value::Map(bag) => bag.borrow_mut().set(property, created),
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn declare_variable(&self, _name: &str) -> Option<Value> {
        Some(Value::list(vec![]))
    }
}
