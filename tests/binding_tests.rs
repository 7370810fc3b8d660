use sqlbind::connection::RecordingHandle;
use sqlbind::{BindError, Binder, Db, DefinitionSource, MemoryCache, Mapper, Op, QueryResult, Record, Value};
use std::sync::Arc;

#[derive(Debug, Clone, Default, PartialEq, Record)]
struct User {
    id: i64,
    name: String,
    age: i32,
}

#[derive(Mapper)]
#[sqlbind(type_name = "User")]
struct UserDao {
    db: Db,
    find_by_name: Op<(String,), Vec<User>>,
    #[sqlbind(name = "DeleteByName")]
    remove: Op<(String,), u64>,
}

fn user_source() -> DefinitionSource {
    DefinitionSource::new("", "User", "user")
        .select(
            "FindByName",
            "name",
            "select {{.fields}} from {{.table}} where name = {{arg .name}}",
        )
        .execute("DeleteByName", "name", "delete from {{.table}} where name = {{arg .name}}")
}

fn setup() -> (Binder, Arc<RecordingHandle>, Db) {
    let mut binder = Binder::new();
    binder.add_source(user_source());
    let handle = Arc::new(RecordingHandle::new());
    let db: Db = handle.clone();
    (binder, handle, db)
}

#[tokio::test]
async fn test_find_by_name_end_to_end() {
    let (mut binder, handle, db) = setup();
    let mut dao = UserDao::with_handle(db);
    binder.map(&mut dao).unwrap();

    handle
        .push_rows(QueryResult::from_rows(
            &["id", "name", "age"],
            vec![vec![Value::Integer(1), Value::from("bar"), Value::Integer(30)]],
        ))
        .unwrap();

    let users = dao.find_by_name.call(("bar".to_string(),)).await.unwrap();
    assert_eq!(
        users,
        vec![User {
            id: 1,
            name: "bar".to_string(),
            age: 30,
        }]
    );

    let call = handle.last_call().unwrap().unwrap();
    assert_eq!(call.sql, "select `id`,`name`,`age` from user where name = ?");
    assert_eq!(call.binds, vec![Value::from("bar")]);
}

#[tokio::test]
async fn test_renamed_operation_field() {
    let (mut binder, handle, db) = setup();
    let mut dao = UserDao::with_handle(db);
    binder.map(&mut dao).unwrap();

    assert_eq!(dao.remove.statement().unwrap().name, "DeleteByName");
    dao.remove.call(("bar".to_string(),)).await.unwrap();
    assert_eq!(
        handle.last_call().unwrap().unwrap().sql,
        "delete from user where name = ?"
    );
}

#[derive(Mapper)]
#[sqlbind(type_name = "Ghost")]
struct GhostDao {
    db: Db,
    find_by_name: Op<(String,), Vec<User>>,
}

#[test]
fn test_unmapped_type() {
    let (mut binder, _handle, db) = setup();
    let mut dao = GhostDao::with_handle(db);
    match binder.map(&mut dao) {
        Err(BindError::UnmappedType(name)) => assert!(name.ends_with("Ghost")),
        other => panic!("expected UnmappedType, got {other:?}"),
    }
}

#[derive(Mapper)]
#[sqlbind(type_name = "User")]
struct OptionalHandleDao {
    db: Option<Db>,
    find_by_name: Op<(String,), Vec<User>>,
}

#[derive(Mapper)]
#[sqlbind(type_name = "User")]
struct NoHandleDao {
    find_by_name: Op<(String,), Vec<User>>,
}

#[test]
fn test_missing_handle() {
    let (mut binder, _handle, _db) = setup();

    let mut dao = OptionalHandleDao {
        db: None,
        find_by_name: Op::default(),
    };
    assert!(matches!(binder.map(&mut dao), Err(BindError::MissingHandle(_))));

    let mut dao = NoHandleDao {
        find_by_name: Op::default(),
    };
    assert!(matches!(binder.map(&mut dao), Err(BindError::MissingHandle(_))));
}

#[test]
fn test_optional_handle_binds() {
    let (mut binder, _handle, db) = setup();
    let mut dao = OptionalHandleDao::with_handle(db);
    assert!(dao.db.is_some());
    binder.map(&mut dao).unwrap();
    assert!(dao.find_by_name.is_bound());
}

#[derive(Mapper)]
#[sqlbind(type_name = "User")]
struct PartlyMappedDao {
    db: Db,
    find_by_name: Op<(String,), Vec<User>>,
    find_by_email: Op<(String,), Vec<User>>,
}

#[test]
fn test_unmapped_operation_leaves_target_untouched() {
    let (mut binder, _handle, db) = setup();
    let mut dao = PartlyMappedDao::with_handle(db);

    match binder.map(&mut dao) {
        Err(BindError::UnmappedOperation { owner, operation }) => {
            assert_eq!(owner, "User");
            assert_eq!(operation, "FindByEmail");
        }
        other => panic!("expected UnmappedOperation, got {other:?}"),
    }
    assert!(!dao.find_by_name.is_bound());
    assert!(!dao.find_by_email.is_bound());
}

#[derive(Mapper)]
#[sqlbind(type_name = "User")]
struct WrongArityDao {
    db: Db,
    find_by_name: Op<(String, i32), Vec<User>>,
}

#[test]
fn test_arity_mismatch_reports_both_counts() {
    let (mut binder, _handle, db) = setup();
    let mut dao = WrongArityDao::with_handle(db);

    let err = binder.map(&mut dao).unwrap_err();
    match &err {
        BindError::ArityMismatch {
            operation,
            declared,
            defined,
        } => {
            assert_eq!(operation, "FindByName");
            assert_eq!(*declared, 2);
            assert_eq!(*defined, 1);
        }
        other => panic!("expected ArityMismatch, got {other:?}"),
    }
    let message = err.to_string();
    assert!(message.contains('1') && message.contains('2'));
}

#[derive(Mapper)]
#[sqlbind(type_name = "User")]
struct WrongShapeDao {
    db: Db,
    #[sqlbind(name = "DeleteByName")]
    remove: Op<(String,), Vec<User>>,
}

#[derive(Mapper)]
#[sqlbind(type_name = "User")]
struct UnitReadDao {
    db: Db,
    find_by_name: Op<(String,), ()>,
}

#[test]
fn test_return_shape_must_suit_statement_kind() {
    let (mut binder, _handle, db) = setup();

    let mut dao = WrongShapeDao::with_handle(Arc::clone(&db));
    assert!(matches!(binder.map(&mut dao), Err(BindError::ShapeMismatch { .. })));

    let mut dao = UnitReadDao::with_handle(db);
    assert!(matches!(binder.map(&mut dao), Err(BindError::ShapeMismatch { .. })));
}

#[derive(Mapper)]
#[sqlbind(type_name = "Broken")]
struct BrokenDao {
    db: Db,
    find_all: Op<(), Vec<User>>,
}

#[test]
fn test_template_syntax_error_at_bind_time() {
    let (mut binder, _handle, db) = setup();
    binder.add_source(DefinitionSource::new("", "Broken", "t").select(
        "FindAll",
        "",
        "select * from {{ .table }} where {{ lower .x }}",
    ));

    let mut dao = BrokenDao::with_handle(db);
    match binder.map(&mut dao) {
        Err(BindError::TemplateSyntax { statement, .. }) => assert_eq!(statement, "FindAll"),
        other => panic!("expected TemplateSyntax, got {other:?}"),
    }
    assert!(!dao.find_all.is_bound());
}

#[derive(Mapper)]
#[sqlbind(package = "app.dao", type_name = "User")]
struct QualifiedDao {
    db: Db,
    #[sqlbind(name = "Count")]
    count: Op<(), i64>,
}

#[tokio::test]
async fn test_qualified_owner_key_wins() {
    let (mut binder, handle, db) = setup();
    binder.add_source(
        DefinitionSource::new("app.dao", "User", "app_user")
            .select("Count", "", "select count(*) from {{.table}}"),
    );
    binder.add_source(DefinitionSource::new("", "User", "user").select("Count", "", "select 0"));

    let mut dao = QualifiedDao::with_handle(db);
    binder.map(&mut dao).unwrap();

    handle
        .push_rows(QueryResult::from_rows(&["count"], vec![vec![Value::Integer(3)]]))
        .unwrap();
    assert_eq!(dao.count.call(()).await.unwrap(), 3);
    assert_eq!(
        handle.last_call().unwrap().unwrap().sql,
        "select count(*) from app_user"
    );
}

#[derive(Mapper)]
#[sqlbind(type_name = "User")]
struct MistypedCacheDao {
    db: Db,
    find_by_name: Op<(String,), Vec<User>>,
    cache: Option<UserDao>,
}

#[derive(Mapper)]
#[sqlbind(type_name = "User")]
struct CachedDao {
    db: Db,
    find_by_name: Op<(String,), Vec<User>>,
    cache: Option<Box<CachedDao>>,
}

#[test]
fn test_bad_cache_field() {
    let (binder, _handle, db) = setup();
    let mut binder = binder.with_cache(Arc::new(MemoryCache::new()));
    let mut dao = MistypedCacheDao::with_handle(db);

    match binder.map(&mut dao) {
        Err(BindError::BadCacheField { type_name, found }) => {
            assert_eq!(type_name, "User");
            assert!(found.contains("UserDao"));
        }
        other => panic!("expected BadCacheField, got {other:?}"),
    }
    assert!(!dao.find_by_name.is_bound());
}

#[test]
fn test_cache_field_needs_backend() {
    let (mut binder, _handle, db) = setup();
    let mut dao = CachedDao::with_handle(db);

    assert!(matches!(binder.map(&mut dao), Err(BindError::CacheUnavailable(_))));
    assert!(!dao.find_by_name.is_bound());
    assert!(dao.cache.is_none());
}

#[test]
fn test_cache_instance_has_no_nested_cache() {
    let (binder, _handle, db) = setup();
    let mut binder = binder.with_cache(Arc::new(MemoryCache::new()));
    let mut dao = CachedDao::with_handle(db);
    binder.map(&mut dao).unwrap();

    let cached = dao.cache.as_ref().unwrap();
    assert!(cached.find_by_name.is_bound());
    assert!(cached.cache.is_none());
    assert!(Arc::ptr_eq(&cached.db, &dao.db));
}

#[test]
fn test_conflicting_sources_fail_binding() {
    let (mut binder, _handle, db) = setup();
    binder.add_source(DefinitionSource::new("", "User", "users"));

    let mut dao = UserDao::with_handle(db);
    assert!(matches!(binder.map(&mut dao), Err(BindError::DefinitionConflict { .. })));
}
