//! Table fetch pipeline against an in-memory repository.
//!
//! Run with: `cargo test --test table_data_test`

use std::cmp::Ordering;
use std::sync::Mutex;

use async_trait::async_trait;
use campusdesk::models::pagination::PageItem;
use campusdesk::models::table::{TableBody, TableQuery};
use campusdesk::services::query_builder::{
    Condition, CountQuery, QueryDescriptor, SortDirection, TableContext,
};
use campusdesk::services::table_data::{get_table_data, TableRepository};
use serde_json::{json, Value};

/// Reads recorded by a repository, in call order.
#[derive(Debug, Clone, PartialEq)]
enum Read {
    FindMany { take: u64, skip: u64 },
    Count,
}

struct MemoryRepo {
    rows: Vec<Value>,
    reads: Mutex<Vec<Read>>,
}

impl MemoryRepo {
    fn new(rows: Vec<Value>) -> Self {
        Self {
            rows,
            reads: Mutex::new(Vec::new()),
        }
    }

    fn reads(&self) -> Vec<Read> {
        self.reads.lock().unwrap().clone()
    }

    fn matching(&self, conditions: &[Condition]) -> Vec<Value> {
        self.rows
            .iter()
            .filter(|row| {
                conditions
                    .iter()
                    .all(|c| lookup(row, c.path.segments()) == Some(&c.value.to_value()))
            })
            .cloned()
            .collect()
    }
}

fn lookup<'a>(row: &'a Value, segments: &[String]) -> Option<&'a Value> {
    segments.iter().try_fold(row, |value, segment| value.get(segment))
}

fn compare(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}

#[async_trait]
impl TableRepository for MemoryRepo {
    type Row = Value;
    type Error = String;

    async fn find_many(&self, query: &QueryDescriptor) -> Result<Vec<Value>, String> {
        self.reads.lock().unwrap().push(Read::FindMany {
            take: query.take,
            skip: query.skip,
        });

        let mut rows = self.matching(&query.conditions);
        let path = query.order_by.path.segments();
        rows.sort_by(|a, b| {
            let ord = compare(lookup(a, path), lookup(b, path));
            match query.order_by.direction {
                SortDirection::Asc => ord,
                SortDirection::Desc => ord.reverse(),
            }
        });

        Ok(rows
            .into_iter()
            .skip(query.skip as usize)
            .take(query.take as usize)
            .collect())
    }

    async fn count(&self, query: &CountQuery) -> Result<u64, String> {
        self.reads.lock().unwrap().push(Read::Count);
        Ok(self.matching(&query.conditions).len() as u64)
    }
}

/// Fails `find_many`, or `count` instead when `fail_on_count` is set.
struct FailingRepo {
    fail_on_count: bool,
    reads: Mutex<usize>,
}

#[async_trait]
impl TableRepository for FailingRepo {
    type Row = Value;
    type Error = String;

    async fn find_many(&self, _query: &QueryDescriptor) -> Result<Vec<Value>, String> {
        *self.reads.lock().unwrap() += 1;
        if self.fail_on_count {
            Ok(Vec::new())
        } else {
            Err("connection reset during find_many".to_string())
        }
    }

    async fn count(&self, _query: &CountQuery) -> Result<u64, String> {
        *self.reads.lock().unwrap() += 1;
        Err("connection reset during count".to_string())
    }
}

fn students(n: usize) -> Vec<Value> {
    let roles = ["admin", "teacher", "student"];
    (1..=n)
        .map(|i| {
            json!({
                "id": i,
                "firstName": format!("Student {i:03}"),
                "age": 10 + (i % 5),
                "status": if i % 4 == 0 { "inactive" } else { "active" },
                "role": { "name": roles[i % roles.len()] }
            })
        })
        .collect()
}

fn context(query: Value, body: Value) -> TableContext {
    let query: TableQuery = serde_json::from_value(query).unwrap();
    let body: TableBody = serde_json::from_value(body).unwrap();
    TableContext::initialize(query, body, "students")
}

fn ids(list: &[Value]) -> Vec<u64> {
    list.iter().map(|row| row["id"].as_u64().unwrap()).collect()
}

#[tokio::test]
async fn empty_table_yields_single_page() {
    let repo = MemoryRepo::new(Vec::new());
    let ctx = context(json!({}), json!({}));

    let result = get_table_data(&repo, &ctx, 1).await.unwrap();

    assert!(result.list.is_empty());
    assert_eq!(result.current_page, 1);
    assert_eq!(result.pagination, vec![PageItem::Page(1)]);
}

#[tokio::test]
async fn issues_exactly_two_reads() {
    let repo = MemoryRepo::new(students(35));
    let ctx = context(json!({ "page": 2, "perPage": 10 }), json!({}));

    get_table_data(&repo, &ctx, 1).await.unwrap();

    assert_eq!(
        repo.reads(),
        vec![Read::FindMany { take: 10, skip: 10 }, Read::Count]
    );
}

#[tokio::test]
async fn returns_requested_page_in_default_order() {
    let repo = MemoryRepo::new(students(35));
    let ctx = context(json!({ "page": 4, "perPage": 10 }), json!({}));

    let result = get_table_data(&repo, &ctx, 1).await.unwrap();

    assert_eq!(ids(&result.list), vec![31, 32, 33, 34, 35]);
    assert_eq!(result.current_page, 4);
    assert_eq!(
        result.pagination,
        vec![
            PageItem::Page(1),
            PageItem::Page(2),
            PageItem::Page(3),
            PageItem::Page(4)
        ]
    );
}

#[tokio::test]
async fn count_reflects_filtered_set_not_page() {
    let repo = MemoryRepo::new(students(200));
    let ctx = context(
        json!({ "page": 1, "perPage": 5 }),
        json!({
            "filters": [{ "status": "active" }],
            "settings": { "filter": [{ "key": "status", "column": "status" }] }
        }),
    );

    let result = get_table_data(&repo, &ctx, 1).await.unwrap();

    // 150 active rows over 5 per page: 30 pages.
    assert_eq!(result.list.len(), 5);
    assert!(result.list.iter().all(|row| row["status"] == "active"));
    assert_eq!(result.pagination.last(), Some(&PageItem::Page(30)));
    assert_eq!(
        result.pagination.iter().filter(|p| p.is_ellipsis()).count(),
        1
    );
}

#[tokio::test]
async fn sorts_and_filters_through_relations() {
    let repo = MemoryRepo::new(students(30));
    let ctx = context(
        json!({ "sort": "age", "sortType": "desc", "perPage": 2 }),
        json!({
            "filters": [{ "roleName": "teacher", "unknown": "ignored" }],
            "settings": {
                "defaultOrderBy": "id",
                "sort": [{ "key": "age", "column": "age" }],
                "filter": [{ "key": "roleName", "column": "role.name" }]
            }
        }),
    );

    let result = get_table_data(&repo, &ctx, 1).await.unwrap();

    // Teachers are ids 1, 4, 7, ..; the two oldest (14) are ids 4 and 19.
    assert_eq!(ids(&result.list), vec![4, 19]);
    assert!(result
        .list
        .iter()
        .all(|row| row["role"]["name"] == "teacher" && row["age"] == 14));
}

#[tokio::test]
async fn numeric_filters_match_numeric_columns() {
    let repo = MemoryRepo::new(students(50));
    let ctx = context(
        json!({ "perPage": 50 }),
        json!({
            "filters": [{ "age": "12" }],
            "settings": { "filter": [{ "key": "age", "column": "age", "isNumber": true }] }
        }),
    );

    let result = get_table_data(&repo, &ctx, 1).await.unwrap();

    assert_eq!(result.list.len(), 10);
    assert!(result.list.iter().all(|row| row["age"] == 12));
}

#[tokio::test]
async fn page_past_the_end_is_reported_but_list_is_empty() {
    let repo = MemoryRepo::new(students(12));
    let ctx = context(json!({ "page": 9 }), json!({}));

    let result = get_table_data(&repo, &ctx, 1).await.unwrap();

    assert!(result.list.is_empty());
    assert_eq!(result.current_page, 9);
    assert_eq!(
        result.pagination,
        vec![PageItem::Page(1), PageItem::Page(2)]
    );
}

#[tokio::test]
async fn find_many_error_propagates_unchanged() {
    let repo = FailingRepo {
        fail_on_count: false,
        reads: Mutex::new(0),
    };
    let ctx = context(json!({}), json!({}));

    let err = get_table_data(&repo, &ctx, 1).await.unwrap_err();

    assert_eq!(err, "connection reset during find_many");
    assert_eq!(*repo.reads.lock().unwrap(), 1);
}

#[tokio::test]
async fn count_error_propagates_unchanged() {
    let repo = FailingRepo {
        fail_on_count: true,
        reads: Mutex::new(0),
    };
    let ctx = context(json!({}), json!({}));

    let err = get_table_data(&repo, &ctx, 1).await.unwrap_err();

    assert_eq!(err, "connection reset during count");
    assert_eq!(*repo.reads.lock().unwrap(), 2);
}

#[tokio::test]
async fn concurrent_requests_do_not_share_state() {
    let repo = std::sync::Arc::new(MemoryRepo::new(students(100)));

    let handles: Vec<_> = (1..=10u64)
        .map(|page| {
            let repo = repo.clone();
            tokio::spawn(async move {
                let ctx = context(json!({ "page": page, "perPage": 10 }), json!({}));
                let result = get_table_data(repo.as_ref(), &ctx, 1).await.unwrap();
                (page, ids(&result.list), result.current_page)
            })
        })
        .collect();

    for handle in handles {
        let (page, ids, current_page) = handle.await.unwrap();
        assert_eq!(current_page, page);
        let first = (page - 1) * 10 + 1;
        assert_eq!(ids, (first..first + 10).collect::<Vec<_>>());
    }
}
