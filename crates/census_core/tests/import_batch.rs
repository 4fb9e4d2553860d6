use census_core::db::open_db_in_memory;
use census_core::{
    Citizen, CitizenId, Gender, ImportService, RelativeIndex, ServiceError,
    SqliteCitizenRepository,
};
use chrono::NaiveDate;
use rusqlite::Connection;

fn citizen(citizen_id: CitizenId, town: &str, birth: (i32, u32, u32), relatives: &[CitizenId]) -> Citizen {
    Citizen {
        citizen_id,
        town: town.to_string(),
        street: "Льва Толстого".to_string(),
        building: "16к7стр5".to_string(),
        apartment: 7,
        name: format!("Иванов {citizen_id}"),
        birth_date: NaiveDate::from_ymd_opt(birth.0, birth.1, birth.2).unwrap(),
        gender: Gender::Male,
        relatives: relatives.iter().copied().collect(),
    }
}

fn sample_batch() -> Vec<Citizen> {
    vec![
        citizen(1, "Москва", (1986, 12, 26), &[2, 3]),
        citizen(2, "Москва", (1997, 4, 1), &[1]),
        citizen(3, "Керчь", (1986, 11, 23), &[]),
    ]
}

fn count_rows(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {table};"), [], |row| {
        row.get(0)
    })
    .unwrap()
}

#[test]
fn create_import_completes_one_sided_relations() {
    let mut conn = open_db_in_memory().unwrap();
    let mut service = ImportService::new(SqliteCitizenRepository::try_new(&mut conn).unwrap());

    let import_id = service.create_import(sample_batch()).unwrap();
    let stored = service.list_citizens(import_id).unwrap();

    let ids: Vec<CitizenId> = stored.iter().map(|c| c.citizen_id).collect();
    assert_eq!(ids, vec![1, 2, 3]);
    assert_eq!(stored[2].relatives, [1].into_iter().collect());
    assert!(RelativeIndex::from_citizens(import_id, &stored).is_symmetric());
    assert!(stored.iter().all(|c| !c.is_self_related()));
}

#[test]
fn stored_citizens_round_trip_every_field() {
    let mut conn = open_db_in_memory().unwrap();
    let mut service = ImportService::new(SqliteCitizenRepository::try_new(&mut conn).unwrap());

    let mut batch = sample_batch();
    batch[2].gender = Gender::Female;
    batch[2].apartment = 11;
    let import_id = service.create_import(batch.clone()).unwrap();

    let stored = service.list_citizens(import_id).unwrap();
    let kerch = &stored[2];
    assert_eq!(kerch.town, "Керчь");
    assert_eq!(kerch.gender, Gender::Female);
    assert_eq!(kerch.apartment, 11);
    assert_eq!(kerch.birth_date, batch[2].birth_date);
    assert_eq!(stored[0], batch[0]);
}

#[test]
fn import_ids_are_monotonic() {
    let mut conn = open_db_in_memory().unwrap();
    let mut service = ImportService::new(SqliteCitizenRepository::try_new(&mut conn).unwrap());

    let first = service.create_import(sample_batch()).unwrap();
    let second = service.create_import(sample_batch()).unwrap();
    assert!(first >= 1);
    assert!(second > first);

    // Same citizen ids in two imports stay independent.
    assert_eq!(service.list_citizens(first).unwrap().len(), 3);
    assert_eq!(service.list_citizens(second).unwrap().len(), 3);
}

#[test]
fn unknown_relative_rejects_whole_batch() {
    let mut conn = open_db_in_memory().unwrap();
    {
        let mut service =
            ImportService::new(SqliteCitizenRepository::try_new(&mut conn).unwrap());
        let mut batch = sample_batch();
        batch[1].relatives.insert(42);

        let err = service.create_import(batch).unwrap_err();
        assert!(matches!(
            err,
            ServiceError::UnknownRelative {
                citizen_id: 2,
                relative_id: 42
            }
        ));
    }

    assert_eq!(count_rows(&conn, "imports"), 0);
    assert_eq!(count_rows(&conn, "citizens"), 0);
    assert_eq!(count_rows(&conn, "citizen_relatives"), 0);
}

#[test]
fn duplicate_citizen_ids_are_rejected_before_graph() {
    let mut conn = open_db_in_memory().unwrap();
    let mut service = ImportService::new(SqliteCitizenRepository::try_new(&mut conn).unwrap());

    // The duplicate also lists an unknown relative: uniqueness must win.
    let mut batch = sample_batch();
    batch.push(citizen(2, "Москва", (1990, 1, 1), &[99]));

    let err = service.create_import(batch).unwrap_err();
    assert!(matches!(err, ServiceError::DuplicateCitizenId(2)));
}

#[test]
fn self_reference_and_empty_batch_are_rejected() {
    let mut conn = open_db_in_memory().unwrap();
    let mut service = ImportService::new(SqliteCitizenRepository::try_new(&mut conn).unwrap());

    let mut batch = sample_batch();
    batch[0].relatives.insert(1);
    let err = service.create_import(batch).unwrap_err();
    assert!(matches!(err, ServiceError::SelfReference(1)));

    let err = service.create_import(Vec::new()).unwrap_err();
    assert!(matches!(err, ServiceError::EmptyBatch));
}

#[test]
fn listing_unknown_import_is_not_found() {
    let mut conn = open_db_in_memory().unwrap();
    let service = ImportService::new(SqliteCitizenRepository::try_new(&mut conn).unwrap());

    let err = service.list_citizens(77).unwrap_err();
    assert!(matches!(err, ServiceError::ImportNotFound(77)));
    assert!(err.is_not_found());
}

#[test]
fn batch_decoded_from_json_is_accepted() {
    let payload = r#"[
        {"citizen_id": 1, "town": "Москва", "street": "Льва Толстого",
         "building": "16к7стр5", "apartment": 7, "name": "Иванов Иван Иванович",
         "birth_date": "26.12.1986", "gender": "male", "relatives": [2]},
        {"citizen_id": 2, "town": "Москва", "street": "Льва Толстого",
         "building": "16к7стр5", "apartment": 7, "name": "Иванов Сергей Иванович",
         "birth_date": "01.04.1997", "gender": "male", "relatives": []}
    ]"#;
    let batch: Vec<Citizen> = serde_json::from_str(payload).unwrap();

    let mut conn = open_db_in_memory().unwrap();
    let mut service = ImportService::new(SqliteCitizenRepository::try_new(&mut conn).unwrap());
    let import_id = service.create_import(batch).unwrap();

    let stored = service.list_citizens(import_id).unwrap();
    let json = serde_json::to_value(&stored).unwrap();
    assert_eq!(json[1]["relatives"], serde_json::json!([1]));
    assert_eq!(json[1]["birth_date"], "01.04.1997");
}
