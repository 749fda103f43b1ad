//! Filtering, sorting and pagination of `get_all`.

use serde_json::json;

use super::{ConformanceHarness, Fixture, ids};
use crate::filter::{Comparison, Filter};
use crate::object::Object;
use crate::scope::{Scope, ScopePattern};
use crate::sort::Sort;
use crate::traits::Storage;
use crate::types::Query;
use crate::value::Value;

fn values(json: serde_json::Value) -> Value {
    Value::from(json)
}

async fn count_matching<B: Storage + 'static>(fx: &Fixture<B>, filter: Filter) -> usize {
    fx.get_all(Query::new().with_filter(filter)).await.objects.len()
}

/// Sorted `flavor` values of the objects matching `filter`.
async fn flavors_matching<B: Storage + 'static>(fx: &Fixture<B>, filter: Filter) -> Vec<String> {
    let mut flavors: Vec<_> = fx
        .get_all(Query::new().with_filter(filter))
        .await
        .objects
        .iter()
        .filter_map(|o| o.get("flavor").and_then(Value::as_str).map(str::to_string))
        .collect();
    flavors.sort();
    flavors
}

pub async fn get_all_handles_parent_id_pattern_matching<H: ConformanceHarness>(harness: &H) {
    let fx = Fixture::new(harness).await;
    for parent_id in ["abc", "abcd", "efg"] {
        fx.create_in(&Scope::new("c", parent_id), json!({})).await;
    }
    let result = fx.get_all_in(&ScopePattern::new("c", "ab*"), Query::new()).await;
    assert_eq!(result.objects.len(), 2);
    assert_eq!(result.total, 2);
}

pub async fn get_all_does_proper_parent_id_pattern_matching<H: ConformanceHarness>(harness: &H) {
    let fx = Fixture::new(harness).await;
    for parent_id in ["abc", "xabcx", "efg"] {
        fx.create_in(&Scope::new("c", parent_id), json!({})).await;
    }
    let result = fx.get_all_in(&ScopePattern::new("c", "ab*"), Query::new()).await;
    assert_eq!(result.objects.len(), 1);
    assert_eq!(result.total, 1);
}

pub async fn get_all_parent_id_handles_collisions<H: ConformanceHarness>(harness: &H) {
    let fx = Fixture::new(harness).await;
    let abc = Scope::new("c", "abc");
    let abcd = Scope::new("c", "abcd");
    fx.create_in(&abc, json!({"id": "same", "secret": "abc"})).await;
    fx.create_in(&abcd, json!({"id": "same", "secret": "abcd"})).await;

    let result = fx.get_all_in(&ScopePattern::new("c", "ab*"), Query::new()).await;
    assert_eq!(result.objects.len(), 2);
    assert_eq!(result.total, 2);

    let result = fx.get_all_in(&ScopePattern::from(&abc), Query::new()).await;
    assert_eq!(result.objects.len(), 1);
    assert_eq!(result.objects[0].get("secret"), Some(&Value::from("abc")));
}

pub async fn get_all_returns_all_values<H: ConformanceHarness>(harness: &H) {
    let fx = Fixture::new(harness).await;
    for _ in 0..10 {
        fx.create(json!({"foo": "bar"})).await;
    }
    let result = fx.get_all(Query::new()).await;
    assert_eq!(result.objects.len(), 10);
    assert_eq!(result.total, 10);
}

pub async fn get_all_handles_limit<H: ConformanceHarness>(harness: &H) {
    let fx = Fixture::new(harness).await;
    for _ in 0..10 {
        fx.create(json!({"foo": "bar"})).await;
    }
    let result = fx.get_all(Query::new().with_limit(4)).await;
    assert_eq!(result.objects.len(), 4);
    assert_eq!(result.total, 10);
}

pub async fn get_all_handles_sorting_on_id<H: ConformanceHarness>(harness: &H) {
    let fx = Fixture::new(harness).await;
    for id in ["c", "a", "b"] {
        fx.create(json!({"id": id})).await;
    }
    let result = fx.get_all(Query::new().with_sort(Sort::asc("id"))).await;
    assert_eq!(ids(&result.objects), vec!["a", "b", "c"]);
}

pub async fn get_all_handles_sorting_on_subobject<H: ConformanceHarness>(harness: &H) {
    let fx = Fixture::new(harness).await;
    for age in [30, 7, 99, 42] {
        fx.create(json!({"person": {"age": age}})).await;
    }
    let result = fx.get_all(Query::new().with_sort(Sort::asc("person.age"))).await;
    let ages: Vec<_> = result
        .objects
        .iter()
        .filter_map(|o| o.resolve("person.age").and_then(Value::as_i64))
        .collect();
    assert_eq!(ages, vec![7, 30, 42, 99]);
}

pub async fn get_all_sorting_is_consistent_with_filtering<H: ConformanceHarness>(harness: &H) {
    let fx = Fixture::new(harness).await;
    fx.create(json!({"flavor": "strawberry"})).await;
    fx.create(json!({"flavor": "blueberry", "author": null})).await;
    fx.create(json!({"flavor": "raspberry", "author": 1})).await;
    fx.create(json!({"flavor": "orange", "author": true})).await;
    fx.create(json!({"flavor": "watermelon", "author": "Ethan"})).await;

    let sorted = Query::new().with_sort(Sort::asc("author"));
    let everything = fx.get_all(sorted.clone()).await.objects;
    assert_eq!(everything.len(), 5);

    let representatives = [
        Some(Value::from("A")),
        Some(Value::from("Z")),
        Some(Value::from("")),
        Some(Value::from(0)),
        Some(Value::from(4)),
        Some(Value::Null),
        None,
    ];
    let split = |value: &Option<Value>, operator| Filter {
        field: "author".into(),
        value: value.clone(),
        operator,
    };
    for value in &representatives {
        for (lower, upper) in [
            (Comparison::Lt, Comparison::Min),
            (Comparison::Max, Comparison::Gt),
        ] {
            let mut parts = fx
                .get_all(sorted.clone().with_filter(split(value, lower)))
                .await
                .objects;
            parts.extend(
                fx.get_all(sorted.clone().with_filter(split(value, upper)))
                    .await
                    .objects,
            );
            assert_eq!(
                parts, everything,
                "filtering with {lower} / {upper} {value:?} is inconsistent with sorting"
            );
        }
    }
}

pub async fn get_all_can_filter_with_list_of_values<H: ConformanceHarness>(harness: &H) {
    let fx = Fixture::new(harness).await;
    for code in ["a", "b", "c"] {
        fx.create(json!({"code": code})).await;
    }
    let filter = Filter::new("code", values(json!(["a", "b"])), Comparison::In);
    assert_eq!(count_matching(&fx, filter).await, 2);

    let first = fx.create(json!({"code": "d"})).await;
    let second = fx.create(json!({"code": "e"})).await;
    let on_ids = Value::from(vec![
        Value::from(first.id().unwrap()),
        Value::from(second.id().unwrap()),
    ]);
    assert_eq!(count_matching(&fx, Filter::new("id", on_ids, Comparison::In)).await, 2);
}

pub async fn get_all_can_filter_with_list_of_excluded_values<H: ConformanceHarness>(harness: &H) {
    let fx = Fixture::new(harness).await;
    for code in [1, 2, 3] {
        fx.create(json!({"code": code, "sub": {"city": code}})).await;
    }
    let exclude = |field: &str, json| Filter::new(field, values(json), Comparison::Exclude);
    assert_eq!(count_matching(&fx, exclude("code", json!([1, 2]))).await, 1);
    assert_eq!(count_matching(&fx, exclude("code", json!([1, "b"]))).await, 2);
    assert_eq!(count_matching(&fx, exclude("sub.city", json!([1, 2]))).await, 1);
}

pub async fn get_all_returns_empty_when_including_list_of_empty_values<H: ConformanceHarness>(
    harness: &H,
) {
    let fx = Fixture::new(harness).await;
    fx.create(json!({"code": "a"})).await;
    fx.create(json!({"code": "b"})).await;
    let filter = Filter::new("id", values(json!([])), Comparison::In);
    assert_eq!(count_matching(&fx, filter).await, 0);
}

pub async fn get_all_can_filter_on_array_that_contains_values<H: ConformanceHarness>(harness: &H) {
    let fx = Fixture::new(harness).await;
    fx.create(json!({"colors": ["red", "green", "blue"]})).await;
    fx.create(json!({"colors": ["gray", "blue"]})).await;
    fx.create(json!({"colors": ["red", "gray", "blue"]})).await;
    fx.create(json!({"colors": ["purple", "green", "blue"]})).await;
    fx.create(json!({"fib": [1, 2, 3]})).await;
    fx.create(json!({"fib": [2, 3, 5]})).await;
    fx.create(json!({"fib": [3, 5, 8]})).await;

    let contains = |field: &str, json| Filter::new(field, values(json), Comparison::Contains);
    assert_eq!(count_matching(&fx, contains("colors", json!(["red"]))).await, 2);
    assert_eq!(count_matching(&fx, contains("colors", json!(["red", "gray"]))).await, 1);
    assert_eq!(count_matching(&fx, contains("fib", json!([2]))).await, 2);
    assert_eq!(count_matching(&fx, contains("fib", json!([2, 3]))).await, 2);
    assert_eq!(count_matching(&fx, contains("fib", json!([3]))).await, 3);
}

pub async fn get_all_can_filter_on_array_that_contains_any_value<H: ConformanceHarness>(
    harness: &H,
) {
    let fx = Fixture::new(harness).await;
    fx.create(json!({"colors": ["red", "green", "blue"]})).await;
    fx.create(json!({"colors": ["gray", "blue"]})).await;
    fx.create(json!({"colors": ["red", "gray", "blue"]})).await;
    fx.create(json!({"colors": ["purple", "green", "blue"]})).await;
    fx.create(json!({"fib": [1, 2, 3]})).await;
    fx.create(json!({"fib": [2, 3, 5]})).await;
    fx.create(json!({"fib": [3, 5, 8]})).await;
    fx.create(json!({"fib": [5, 8, 13]})).await;

    let any = |field: &str, json| Filter::new(field, values(json), Comparison::ContainsAny);
    assert_eq!(count_matching(&fx, any("colors", json!(["red"]))).await, 2);
    assert_eq!(count_matching(&fx, any("colors", json!(["red", "gray"]))).await, 3);
    assert_eq!(count_matching(&fx, any("fib", json!([2]))).await, 2);
    assert_eq!(count_matching(&fx, any("fib", json!([2, 13]))).await, 3);
}

pub async fn get_all_contains_ignores_non_arrays_and_unsupported_types<H: ConformanceHarness>(
    harness: &H,
) {
    let fx = Fixture::new(harness).await;
    fx.create(json!({"code": "black"})).await;
    fx.create(json!({"fib": [2, 3, 5]})).await;
    fx.create(json!({"fib": [3, 5, 8]})).await;
    fx.create(json!({"fib": {"html": "#00FF00"}})).await;

    for operator in [Comparison::Contains, Comparison::ContainsAny] {
        let filter = |json| Filter::new("fib", values(json), operator);
        assert_eq!(count_matching(&fx, filter(json!([2]))).await, 1);
        assert_eq!(count_matching(&fx, filter(json!([{"demo": "foobar"}]))).await, 0);
        assert_eq!(count_matching(&fx, filter(json!([{"html": "#00FF00"}]))).await, 0);
    }
}

pub async fn get_all_can_filter_with_numeric_values<H: ConformanceHarness>(harness: &H) {
    let fx = Fixture::new(harness).await;
    fx.create(json!({"missing": "code"})).await;
    for code in [1, 10, 6, 46] {
        fx.create(json!({"code": code})).await;
    }
    let codes = |objects: &[Object]| -> Vec<i64> {
        objects
            .iter()
            .filter_map(|o| o.get("code").and_then(Value::as_i64))
            .collect()
    };

    let query = Query::new()
        .with_sort(Sort::asc("code"))
        .with_filter(Filter::new("code", 10, Comparison::Max));
    let result = fx.get_all(query).await;
    assert_eq!(codes(&result.objects), vec![1, 6, 10]);
    assert_eq!(result.objects.len(), 3);

    let query = Query::new()
        .with_sort(Sort::asc("code"))
        .with_filter(Filter::new("code", 10, Comparison::Lt));
    let result = fx.get_all(query).await;
    assert_eq!(codes(&result.objects), vec![1, 6]);
    assert_eq!(result.objects.len(), 2);
}

pub async fn get_all_can_filter_with_numeric_strings<H: ConformanceHarness>(harness: &H) {
    let fx = Fixture::new(harness).await;
    for phone in ["0566199093", "0781566199"] {
        fx.create(json!({"phone": phone})).await;
    }
    let eq = Filter::new("phone", "0566199093", Comparison::Eq);
    assert_eq!(count_matching(&fx, eq).await, 1);
    // The leading zero would be lost to a numeric reading.
    let number = Filter::new("phone", 566_199_093, Comparison::Eq);
    assert_eq!(count_matching(&fx, number).await, 0);
}

pub async fn get_all_can_filter_with_empty_numeric_strings<H: ConformanceHarness>(harness: &H) {
    let fx = Fixture::new(harness).await;
    for phone in ["0566199093", "0781566199"] {
        fx.create(json!({"phone": phone})).await;
    }
    assert_eq!(count_matching(&fx, Filter::new("phone", "", Comparison::Eq)).await, 0);
}

pub async fn get_all_can_filter_with_float_values<H: ConformanceHarness>(harness: &H) {
    let fx = Fixture::new(harness).await;
    for note in [json!(10), json!(11.5), json!(8.5), json!(6), json!(7.5)] {
        fx.create(json!({"note": note})).await;
    }
    assert_eq!(count_matching(&fx, Filter::new("note", 9.5, Comparison::Lt)).await, 3);
    assert_eq!(count_matching(&fx, Filter::new("note", 10.0, Comparison::Eq)).await, 1);
}

pub async fn get_all_can_filter_minimum_value_with_strings<H: ConformanceHarness>(harness: &H) {
    let fx = Fixture::new(harness).await;
    for version in ["49.0", "6.0", "53.0b4"] {
        fx.create(json!({"product": {"version": version}})).await;
    }
    let query = Query::new()
        .with_sort(Sort::asc("product.version"))
        .with_filter(Filter::new("product.version", "50.0", Comparison::Min));
    let result = fx.get_all(query).await;
    let versions: Vec<_> = result
        .objects
        .iter()
        .filter_map(|o| o.resolve("product.version").and_then(Value::as_str))
        .collect();
    assert_eq!(versions, vec!["53.0b4", "6.0"]);
}

pub async fn get_all_does_not_implicitly_cast<H: ConformanceHarness>(harness: &H) {
    let fx = Fixture::new(harness).await;
    for version in ["49.0", "6.0", "53.0b4"] {
        fx.create(json!({"product": {"version": version}})).await;
    }
    // Numbers sort before strings: every string is above 50, none below.
    let max = Filter::new("product.version", 50.0, Comparison::Max);
    assert_eq!(count_matching(&fx, max).await, 0);
    let eq = Filter::new("product.version", 49.0, Comparison::Eq);
    assert_eq!(count_matching(&fx, eq).await, 0);

    fx.create(json!({"id": "0"})).await;
    assert_eq!(count_matching(&fx, Filter::new("id", 0, Comparison::Eq)).await, 0);
    assert_eq!(count_matching(&fx, Filter::new("id", "0", Comparison::Eq)).await, 1);
}

pub async fn get_all_can_deal_with_missing_values<H: ConformanceHarness>(harness: &H) {
    let fx = Fixture::new(harness).await;
    fx.create(json!({"name": "Alexis"})).await;
    fx.create(json!({"title": "haha"})).await;
    fx.create(json!({"name": "Mathieu"})).await;

    // Missing values compare greater than everything.
    let result = fx
        .get_all(Query::new().with_filter(Filter::new("name", "Fanny", Comparison::Gt)))
        .await;
    assert_eq!(result.objects.len(), 2);
    assert!(result.objects.iter().any(|o| o.get("title").is_some()));

    let result = fx
        .get_all(Query::new().with_filter(Filter::new("name", "Fanny", Comparison::Lt)))
        .await;
    assert_eq!(result.objects.len(), 1);
    assert_eq!(result.objects[0].get("name"), Some(&Value::from("Alexis")));
}

pub async fn get_all_can_filter_with_null_values<H: ConformanceHarness>(harness: &H) {
    let fx = Fixture::new(harness).await;
    fx.create(json!({"name": "Alexis", "salary": null})).await;
    fx.create(json!({"name": "Mathieu", "salary": "null"})).await;
    fx.create(json!({"name": "Niko", "salary": ""})).await;
    fx.create(json!({"name": "Ethan"})).await;

    let result = fx
        .get_all(Query::new().with_filter(Filter::new("salary", Value::Null, Comparison::Eq)))
        .await;
    assert_eq!(result.objects.len(), 1);
    assert_eq!(result.objects[0].get("name"), Some(&Value::from("Alexis")));

    let query = Query::new()
        .with_filter(Filter::new("salary", 0, Comparison::Gt))
        .with_filter(Filter::new("salary", true, Comparison::Has));
    let result = fx.get_all(query).await;
    assert_eq!(result.objects.len(), 3);
    assert!(result.objects.iter().all(|o| o.contains_key("salary")));
}

pub async fn get_all_can_filter_matching_a_list_or_an_object<H: ConformanceHarness>(harness: &H) {
    let fx = Fixture::new(harness).await;
    fx.create(json!({"flavor": "strawberry", "orders": [], "attributes": {}})).await;
    fx.create(json!({
        "flavor": "blueberry",
        "orders": [1],
        "attributes": {"ibu": 25, "seen_on": "2017-06-01"},
    }))
    .await;
    fx.create(json!({
        "flavor": "pineapple",
        "orders": [1, 2],
        "attributes": {"ibu": 25, "seen_on": "2017-06-01", "price": 9.99},
    }))
    .await;
    fx.create(json!({"flavor": "watermelon", "orders": "", "attributes": []})).await;
    fx.create(json!({"flavor": "raspberry", "orders": {}})).await;

    let eq = |field: &str, json| Filter::new(field, values(json), Comparison::Eq);
    assert_eq!(flavors_matching(&fx, eq("orders", json!([]))).await, vec!["strawberry"]);
    assert_eq!(flavors_matching(&fx, eq("orders", json!([1]))).await, vec!["blueberry"]);
    assert_eq!(flavors_matching(&fx, eq("attributes", json!({}))).await, vec!["strawberry"]);
    assert_eq!(
        flavors_matching(&fx, eq("attributes", json!({"ibu": 25, "seen_on": "2017-06-01"}))).await,
        vec!["blueberry"]
    );
}

pub async fn get_all_supports_has<H: ConformanceHarness>(harness: &H) {
    let fx = Fixture::new(harness).await;
    fx.create(json!({"flavor": "strawberry"})).await;
    fx.create(json!({"flavor": "blueberry", "author": null})).await;
    fx.create(json!({"flavor": "raspberry", "author": ""})).await;
    fx.create(json!({"flavor": "watermelon", "author": "hello"})).await;
    fx.create(json!({"flavor": "pineapple", "author": "null"})).await;

    assert_eq!(
        flavors_matching(&fx, Filter::new("author", true, Comparison::Has)).await,
        vec!["blueberry", "pineapple", "raspberry", "watermelon"]
    );
    assert_eq!(
        flavors_matching(&fx, Filter::new("author", false, Comparison::Has)).await,
        vec!["strawberry"]
    );
}

pub async fn get_all_can_filter_by_subobject_values<H: ConformanceHarness>(harness: &H) {
    let fx = Fixture::new(harness).await;
    for sub in ["a", "b", "c"] {
        fx.create(json!({"code": {"sub": sub}})).await;
    }
    assert_eq!(count_matching(&fx, Filter::new("code.sub", "a", Comparison::Eq)).await, 1);
    assert_eq!(count_matching(&fx, Filter::new("code.sub", "a", Comparison::Not)).await, 2);
}

pub async fn get_all_can_filter_with_like<H: ConformanceHarness>(harness: &H) {
    let fx = Fixture::new(harness).await;
    for name in ["foo", "aafooll", "bar", "FOOBAR", "eabcg", "aabcc", "abc", "aec"] {
        fx.create(json!({"name": name})).await;
    }
    fx.create(json!({"name": 42})).await;

    assert_eq!(count_matching(&fx, Filter::new("name", "FoO", Comparison::Like)).await, 3);
    assert_eq!(count_matching(&fx, Filter::new("name", "a*b*c", Comparison::Like)).await, 2);
    assert_eq!(count_matching(&fx, Filter::new("name", "*bar", Comparison::Like)).await, 2);
}

pub async fn count_all_counts_live_matching_objects<H: ConformanceHarness>(harness: &H) {
    let fx = Fixture::new(harness).await;
    fx.create(json!({"flavor": "mint"})).await;
    fx.create(json!({"flavor": "mint"})).await;
    fx.create(json!({"flavor": "vanilla"})).await;
    fx.create_and_delete(json!({"flavor": "mint"})).await;
    fx.create_in(&fx.other_scope, json!({"flavor": "mint"})).await;

    let mint = [Filter::new("flavor", "mint", Comparison::Eq)];
    assert_eq!(fx.storage.count_all(&fx.pattern(), &mint).await.unwrap(), 2);
    assert_eq!(fx.storage.count_all(&fx.pattern(), &[]).await.unwrap(), 3);
    let both = ScopePattern::new("test", "*");
    assert_eq!(fx.storage.count_all(&both, &mint).await.unwrap(), 3);
}

pub async fn get_all_handles_pagination_rules<H: ConformanceHarness>(harness: &H) {
    let fx = Fixture::new(harness).await;
    for x in 0..10 {
        fx.create(json!({"number": x % 3})).await;
    }
    let query = Query::new()
        .with_limit(5)
        .with_pagination_rules(vec![vec![Filter::new("number", 1, Comparison::Gt)]]);
    let result = fx.get_all(query).await;
    assert_eq!(result.total, 10);
    assert_eq!(result.objects.len(), 3);
}

pub async fn get_all_handles_all_pagination_rules<H: ConformanceHarness>(harness: &H) {
    let fx = Fixture::new(harness).await;
    let mut last = None;
    for x in 0..10 {
        last = Some(fx.create(json!({"number": x % 3})).await);
    }
    let last_id = last.as_ref().and_then(Object::id).unwrap_or_default();
    let query = Query::new().with_limit(5).with_pagination_rules(vec![
        vec![Filter::new("number", 1, Comparison::Gt)],
        vec![Filter::new("id", last_id, Comparison::Eq)],
    ]);
    let result = fx.get_all(query).await;
    assert_eq!(result.total, 10);
    assert_eq!(result.objects.len(), 4);
}

pub async fn pagination_can_skip_everything<H: ConformanceHarness>(harness: &H) {
    let fx = Fixture::new(harness).await;
    for i in 0..5 {
        fx.create(json!({"i": i})).await;
    }
    let query = Query::new()
        .with_limit(5)
        .including_deleted()
        .with_pagination_rules(vec![vec![Filter::new("i", 7, Comparison::Gt)]]);
    let result = fx.get_all(query).await;
    assert!(result.objects.is_empty());
    assert_eq!(result.total, 5);
}

pub async fn get_all_parent_id_paginates_correctly<H: ConformanceHarness>(harness: &H) {
    let fx = Fixture::new(harness).await;
    for parent in 0..10 {
        let parent_id = format!("abc{parent}");
        fx.create_in(
            &Scope::new("c", parent_id.as_str()),
            json!({"id": "some_id", "secret_data": parent_id}),
        )
        .await;
    }
    let pattern = ScopePattern::new("c", "abc*");
    let real = fx.get_all_in(&pattern, Query::new()).await.objects;
    assert_eq!(real.len(), 10);

    let secrets = |objects: &[Object]| {
        let mut secrets: Vec<_> = objects
            .iter()
            .filter_map(|o| o.get("secret_data").and_then(Value::as_str).map(str::to_string))
            .collect();
        secrets.sort();
        secrets
    };

    for sort in [Sort::asc("secret_data"), Sort::desc("secret_data")] {
        for limit in 1..10 {
            let base = Query::new().with_sort(sort.clone()).with_limit(limit);
            let mut seen = Vec::new();
            let mut query = base.clone();
            loop {
                let page = fx.get_all_in(&pattern, query.clone()).await;
                assert_eq!(page.total, real.len());
                seen.extend(page.objects.iter().cloned());
                match page.next_cursor(&query) {
                    Some(cursor) if seen.len() < page.total => query = base.clone().after(&cursor),
                    _ => break,
                }
            }
            assert_eq!(secrets(&seen), secrets(&real), "{sort:?} limit {limit}");
            assert_eq!(seen.len(), real.len(), "{sort:?} limit {limit}");
        }
    }
}

pub async fn get_all_paginates_across_scopes_sharing_a_timestamp<H: ConformanceHarness>(
    harness: &H,
) {
    let fx = Fixture::new(harness).await;
    // The clock stands still, so every scope stamps its first write alike.
    for parent in ["abc0", "abc1", "abc2", "abc3"] {
        fx.create_in(&Scope::new("c", parent), json!({"kind": "same"}))
            .await;
    }
    let pattern = ScopePattern::new("c", "abc*");

    for sort in [Sort::asc("kind"), Sort::desc("kind"), Sort::asc("last_modified")] {
        let base = Query::new().with_sort(sort.clone());
        let full = fx.get_all_in(&pattern, base.clone()).await.objects;
        assert_eq!(full.len(), 4);

        for limit in 1..4 {
            let paged = base.clone().with_limit(limit);
            let mut seen = Vec::new();
            let mut query = paged.clone();
            loop {
                let page = fx.get_all_in(&pattern, query.clone()).await;
                seen.extend(page.objects.iter().cloned());
                match page.next_cursor(&query) {
                    Some(cursor) => query = paged.clone().after(&cursor),
                    None => break,
                }
            }
            assert_eq!(ids(&seen), ids(&full), "{sort:?} limit {limit}");
        }
    }
}

pub async fn get_all_paginates_with_cursor<H: ConformanceHarness>(harness: &H) {
    let fx = Fixture::new(harness).await;
    let kinds = [json!("b"), json!(1), json!(null), json!("a"), json!(true)];
    for i in 0..23 {
        let created = fx
            .create(json!({"kind": kinds[i % kinds.len()], "rank": i % 4}))
            .await;
        if i % 5 == 0 {
            fx.delete(created.id().unwrap_or_default()).await;
        }
    }
    fx.create(json!({"rank": 9})).await;

    for sorting in [
        vec![Sort::asc("kind")],
        vec![Sort::desc("kind"), Sort::asc("rank")],
        vec![Sort::asc("rank"), Sort::desc("kind")],
        vec![Sort::asc("last_modified")],
    ] {
        let base = sorting
            .iter()
            .cloned()
            .fold(Query::new().including_deleted(), Query::with_sort);
        let full = fx.get_all(base.clone()).await;
        assert_eq!(full.objects.len(), 24);
        assert_eq!(full.total, 19);

        for limit in [1, 3, 7, 24] {
            let paged = base.clone().with_limit(limit);
            let mut seen: Vec<Object> = Vec::new();
            let mut query = paged.clone();
            loop {
                let page = fx.get_all(query.clone()).await;
                assert_eq!(page.total, 19);
                if page.objects.is_empty() {
                    break;
                }
                seen.extend(page.objects.iter().cloned());
                let Some(cursor) = page.next_cursor(&query) else {
                    break;
                };
                let token = cursor.encode().expect("cursor encodes");
                let decoded = crate::pagination::Cursor::decode(&token).expect("cursor decodes");
                query = paged.clone().after(&decoded);
            }
            assert_eq!(
                ids(&seen),
                ids(&full.objects),
                "sorting {sorting:?} with limit {limit}"
            );
        }
    }
}
