//! Orchestrator behavior against a recording in-memory session.
//!
//! The mock understands exactly the statement shapes the orchestrator
//! generates (`WHERE 1=1` base, `col = ?` fragments) and records every
//! session operation so tests can assert routing decisions.

use qldao::prelude::*;
use qldao::Row;
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Debug, Default)]
struct User {
    id: Option<i64>,
    username: String,
    age: i64,
    active: bool,
    state: EntityState,
}

impl Entity for User {
    type Id = i64;

    fn table_name() -> &'static str {
        "users"
    }

    fn id_column() -> &'static str {
        "id"
    }

    qldao::attributes! { User { id, username, age, active } }

    fn primary_key(&self) -> Option<i64> {
        self.id
    }

    fn state(&self) -> &EntityState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut EntityState {
        &mut self.state
    }
}

type StoredRow = HashMap<String, Value>;

#[derive(Default)]
struct MockSession {
    tables: Mutex<HashMap<String, Vec<StoredRow>>>,
    next_id: Mutex<i64>,
    ops: Mutex<Vec<String>>,
    fail_references: bool,
}

impl MockSession {
    fn new() -> Self {
        Self::default()
    }

    fn record(&self, op: impl Into<String>) {
        self.ops.lock().unwrap().push(op.into());
    }

    fn ops(&self) -> Vec<String> {
        self.ops.lock().unwrap().clone()
    }

    fn snapshot<T: Entity>(entity: &T) -> StoredRow {
        T::attributes()
            .iter()
            .map(|a| (a.name.to_string(), (a.get)(entity)))
            .collect()
    }

    fn hydrate<T: Entity>(row: &StoredRow) -> T {
        let fields = T::attribute_names();
        let values = fields
            .iter()
            .map(|f| row.get(*f).cloned().unwrap_or(Value::Null))
            .collect();
        T::from_row(&fields, values).expect("stored row hydrates")
    }

    /// Parse `... FROM <table> ... [WHERE 1=1 [AND conds]] [ORDER BY ...]`
    /// and return matching rows.
    fn matching_rows(&self, sql: &str, binds: &[Value]) -> Vec<StoredRow> {
        let after_from = sql.split(" FROM ").nth(1).expect("statement has FROM");
        let table = after_from.split_whitespace().next().unwrap().to_string();

        let mut predicate = match sql.split(" WHERE 1=1").nth(1) {
            Some(rest) => rest,
            None => "",
        };
        if let Some(idx) = predicate.find(" ORDER BY ") {
            predicate = &predicate[..idx];
        }
        let conds: Vec<&str> = match predicate.trim().strip_prefix("AND ") {
            Some(rest) => rest.split(" AND ").collect(),
            None => Vec::new(),
        };

        let tables = self.tables.lock().unwrap();
        let rows = tables.get(&table).cloned().unwrap_or_default();
        rows.into_iter()
            .filter(|row| {
                conds.iter().zip(binds).all(|(cond, bind)| {
                    let col = cond
                        .strip_suffix("= ?")
                        .map(|c| c.trim().trim_start_matches("o."))
                        .expect("mock supports `col = ?` fragments only");
                    row.get(col) == Some(bind)
                })
            })
            .collect()
    }
}

impl Session for MockSession {
    async fn select(
        &self,
        sql: &str,
        binds: &[Value],
        window: Window,
        _cacheable: bool,
    ) -> Result<Vec<Row>, DataError> {
        self.record(format!("select:{sql}"));
        let cols: Vec<String> = sql
            .strip_prefix("SELECT ")
            .and_then(|rest| rest.split(" FROM ").next())
            .expect("projection list")
            .split(", ")
            .map(|c| c.trim_start_matches("o.").to_string())
            .collect();
        let rows = self.matching_rows(sql, binds);
        let skip = window.offset().unwrap_or(0) as usize;
        let take = window.limit().map(|l| l as usize).unwrap_or(usize::MAX);
        Ok(rows
            .into_iter()
            .skip(skip)
            .take(take)
            .map(|row| {
                cols.iter()
                    .map(|c| row.get(c).cloned().unwrap_or(Value::Null))
                    .collect()
            })
            .collect())
    }

    async fn select_scalar(&self, sql: &str, binds: &[Value]) -> Result<i64, DataError> {
        self.record(format!("scalar:{sql}"));
        Ok(self.matching_rows(sql, binds).len() as i64)
    }

    async fn execute(&self, sql: &str, binds: &[Value]) -> Result<u64, DataError> {
        self.record(format!("execute:{sql}"));
        let doomed = self.matching_rows(sql, binds);
        let table = sql
            .split(" FROM ")
            .nth(1)
            .unwrap()
            .split_whitespace()
            .next()
            .unwrap()
            .to_string();
        let mut tables = self.tables.lock().unwrap();
        let rows = tables.entry(table).or_default();
        let before = rows.len();
        rows.retain(|row| !doomed.contains(row));
        Ok((before - rows.len()) as u64)
    }

    async fn find<T: Entity>(&self, id: &T::Id) -> Result<Option<T>, DataError> {
        self.record("find");
        let key: Value = id.clone().into();
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .get(T::table_name())
            .and_then(|rows| rows.iter().find(|r| r.get(T::id_column()) == Some(&key)))
            .map(|row| Self::hydrate(row)))
    }

    async fn get_reference<T: Entity>(&self, id: &T::Id) -> Result<Option<T>, DataError> {
        self.record("get_reference");
        if self.fail_references {
            return Err(DataError::NotFound("connection lost".into()));
        }
        let key: Value = id.clone().into();
        let tables = self.tables.lock().unwrap();
        let exists = tables
            .get(T::table_name())
            .is_some_and(|rows| rows.iter().any(|r| r.get(T::id_column()) == Some(&key)));
        if !exists {
            return Ok(None);
        }
        let mut entity = T::default();
        entity.set_attribute(T::id_column(), key)?;
        entity.state_mut().deferred = true;
        Ok(Some(entity))
    }

    async fn persist<T: Entity>(&self, entity: &mut T) -> Result<(), DataError> {
        self.record("persist");
        if entity.primary_key().is_none() {
            let mut next = self.next_id.lock().unwrap();
            *next += 1;
            entity.set_attribute(T::id_column(), Value::Int(*next))?;
        }
        let row = Self::snapshot(entity);
        self.tables
            .lock()
            .unwrap()
            .entry(T::table_name().to_string())
            .or_default()
            .push(row);
        Ok(())
    }

    async fn merge<T: Entity>(&self, entity: &T) -> Result<(), DataError> {
        self.record("merge");
        let key: Value = entity
            .primary_key()
            .ok_or(DataError::MissingPrimaryKey(T::table_name()))?
            .into();
        let mut tables = self.tables.lock().unwrap();
        let rows = tables.entry(T::table_name().to_string()).or_default();
        if let Some(row) = rows.iter_mut().find(|r| r.get(T::id_column()) == Some(&key)) {
            *row = Self::snapshot(entity);
        }
        Ok(())
    }

    async fn remove<T: Entity>(&self, id: &T::Id) -> Result<(), DataError> {
        self.record("remove");
        let key: Value = id.clone().into();
        let mut tables = self.tables.lock().unwrap();
        if let Some(rows) = tables.get_mut(T::table_name()) {
            rows.retain(|r| r.get(T::id_column()) != Some(&key));
        }
        Ok(())
    }

    async fn clear(&self) -> Result<(), DataError> {
        self.record("clear");
        Ok(())
    }
}

fn user(name: &str, age: i64) -> User {
    User {
        username: name.into(),
        age,
        active: true,
        ..Default::default()
    }
}

async fn seeded(names: &[(&str, i64)]) -> Dao<MockSession> {
    let dao = Dao::new(MockSession::new());
    for (name, age) in names {
        let mut u = user(name, *age);
        dao.create(&mut u).await.unwrap();
    }
    dao
}

#[tokio::test(flavor = "current_thread")]
async fn save_routes_on_primary_key_presence() {
    let dao = Dao::new(MockSession::new());

    let mut fresh = user("alice", 30);
    dao.save(&mut fresh).await.unwrap();
    assert_eq!(dao.session().ops(), vec!["persist"]);
    let id = fresh.id.expect("persist backfills the generated key");

    fresh.age = 31;
    dao.save(&mut fresh).await.unwrap();
    assert_eq!(dao.session().ops(), vec!["persist", "merge"]);

    let reloaded: User = dao.find(&id).await.unwrap().unwrap();
    assert_eq!(reloaded.age, 31);
}

#[tokio::test(flavor = "current_thread")]
async fn update_without_key_is_a_caller_error() {
    let dao = Dao::new(MockSession::new());
    let err = dao.update(&user("bob", 1)).await.unwrap_err();
    assert!(matches!(err, DataError::MissingPrimaryKey("users")));
}

#[tokio::test(flavor = "current_thread")]
async fn delete_silently_skips_missing_ids() {
    let dao = seeded(&[("alice", 30)]).await;
    dao.delete_many::<User>(&[1, 999]).await.unwrap();
    assert_eq!(dao.get_count::<User>().await.unwrap(), 0);
    // only the present id produced a remove
    let removes = dao.session().ops().iter().filter(|o| *o == "remove").count();
    assert_eq!(removes, 1);
}

#[tokio::test(flavor = "current_thread")]
async fn delete_by_where_reports_affected_rows() {
    let dao = seeded(&[("alice", 30), ("bob", 30), ("carol", 40)]).await;
    let affected = dao
        .delete_by_where::<User>("age = ?", &Params::positional([Value::Int(30)]))
        .await
        .unwrap();
    assert_eq!(affected, 2);
    assert_eq!(dao.get_count::<User>().await.unwrap(), 1);
}

#[tokio::test(flavor = "current_thread")]
async fn empty_predicate_matches_every_row() {
    let dao = seeded(&[("alice", 30), ("bob", 31), ("carol", 32)]).await;
    let all: Vec<User> = dao.query_by_where("", &Params::None).await.unwrap();
    assert_eq!(all.len(), 3);
}

#[tokio::test(flavor = "current_thread")]
async fn find_by_where_zero_one_many() {
    let dao = seeded(&[("alice", 30), ("bob", 30)]).await;

    let none: Option<User> = dao
        .find_by_where("username = ?", &Params::positional([Value::Text("zed".into())]))
        .await
        .unwrap();
    assert!(none.is_none());

    let one: Option<User> = dao
        .find_by_where("username = ?", &Params::positional([Value::Text("bob".into())]))
        .await
        .unwrap();
    assert_eq!(one.unwrap().username, "bob");

    let err = dao
        .find_by_where::<User>("age = ?", &Params::positional([Value::Int(30)]))
        .await
        .unwrap_err();
    assert!(matches!(err, DataError::AmbiguousResult { matched: 2 }));
}

#[tokio::test(flavor = "current_thread")]
async fn scroll_returns_the_page_and_the_full_count() {
    let dao = seeded(&[("a", 1), ("b", 2), ("c", 3), ("d", 4), ("e", 5)]).await;
    let page: QueryResult<User> = dao
        .get_scroll_data(Window::new(0, 2), "", &Params::None, &OrderBy::new().asc("id"))
        .await
        .unwrap();
    assert_eq!(page.rows.len(), 2);
    assert_eq!(page.total, 5);

    // the page query carried the order-by, the count query did not
    let ops = dao.session().ops();
    let select = ops.iter().find(|o| o.starts_with("select:")).unwrap();
    assert!(select.contains(" ORDER BY id ASC"));
    let scalar = ops.iter().find(|o| o.starts_with("scalar:")).unwrap();
    assert!(scalar.contains("COUNT(o.id)"));
    assert!(!scalar.contains("ORDER BY"));
}

#[tokio::test(flavor = "current_thread")]
async fn projections_leave_unselected_fields_at_zero() {
    let dao = seeded(&[("alice", 30)]).await;
    let partial: Vec<User> = dao
        .query_fields(&["username", "id"], "", &Params::None, Window::ALL)
        .await
        .unwrap();
    let u = &partial[0];
    assert_eq!(u.username, "alice");
    assert_eq!(u.id, Some(1));
    assert_eq!(u.age, 0);
    assert!(!u.active);

    let tuples = dao
        .query_field_values::<User>(&["age", "username"], "", &Params::None, Window::ALL)
        .await
        .unwrap();
    assert_eq!(tuples, vec![vec![Value::Int(30), Value::Text("alice".into())]]);
}

#[tokio::test(flavor = "current_thread")]
async fn load_defers_attributes_until_asked() {
    let dao = seeded(&[("alice", 30)]).await;
    let mut lazy: User = dao.load(&1).await.expect("reference exists");
    assert!(lazy.state().deferred);
    assert_eq!(lazy.username, "");

    dao.load_lazy_attributes(&mut lazy).await.unwrap();
    assert!(!lazy.state().deferred);
    assert_eq!(lazy.username, "alice");
    assert_eq!(lazy.age, 30);

    // idempotent
    dao.load_lazy_attributes(&mut lazy).await.unwrap();
    assert_eq!(lazy.username, "alice");
}

#[tokio::test(flavor = "current_thread")]
async fn load_downgrades_provider_failures_to_absent() {
    let session = MockSession {
        fail_references: true,
        ..Default::default()
    };
    let dao = Dao::new(session);
    let gone: Option<User> = dao.load(&1).await;
    assert!(gone.is_none());

    // find keeps the error
    let dao = seeded(&[("alice", 30)]).await;
    assert!(dao.load::<User>(&999).await.is_none());
}

#[tokio::test(flavor = "current_thread")]
async fn existence_checks_ride_on_counts() {
    let dao = seeded(&[("alice", 30)]).await;
    assert!(dao
        .is_existed_by_where::<User>("username = ?", &Params::positional([Value::Text("alice".into())]))
        .await
        .unwrap());
    assert!(!dao
        .is_existed_by_where::<User>("username = ?", &Params::positional([Value::Text("zed".into())]))
        .await
        .unwrap());
}

#[tokio::test(flavor = "current_thread")]
async fn clear_passes_through_to_the_session() {
    let dao = Dao::new(MockSession::new());
    dao.clear().await.unwrap();
    assert_eq!(dao.session().ops(), vec!["clear"]);
}
