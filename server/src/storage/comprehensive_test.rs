//! Comprehensive tests run against every backend implementation

#[cfg(test)]
mod integration_tests {
    use bytes::Bytes;
    use futures::TryStreamExt;
    use std::sync::Arc;

    use crate::error::StorageError;
    use crate::model::{FieldValue, Record};
    use crate::storage::blob::{local_store::LocalBlobStore, mock_store::MockBlobStore, BlobStore, PublicAccess};
    use crate::storage::fileshare::{local_store::LocalFileShare, mock_store::MockFileShare, FileShareStore};
    use crate::storage::queue::{mock_store::MockQueueStore, sqlite_store::SqliteQueueStore, QueueStore};
    use crate::storage::table::{
        mock_store::MockTableStore, sqlite_store::SqliteTableStore, TableStore, UpdateMode, ANY_VERSION,
    };

    fn table_backends() -> Vec<(&'static str, Arc<dyn TableStore>)> {
        vec![
            ("mock", Arc::new(MockTableStore::new())),
            ("sqlite", Arc::new(SqliteTableStore::in_memory().unwrap())),
        ]
    }

    fn product(row_key: &str, name: &str) -> Record {
        Record::new("Product", row_key).with_field("ProductName", FieldValue::Text(name.to_string()))
    }

    #[actix_web::test]
    async fn test_table_crud_on_all_backends() {
        for (backend_name, store) in table_backends() {
            assert!(
                matches!(store.insert("Products", product("p1", "A")).await, Err(StorageError::NotFound(_))),
                "{}: insert into a missing table should fail",
                backend_name
            );
            store.ensure_table("Products").await.unwrap();
            store.ensure_table("Products").await.unwrap();

            let created = store.insert("Products", product("p1", "A")).await.unwrap();
            assert!(created.etag.is_some(), "{}: insert assigns a version", backend_name);
            assert!(created.timestamp.is_some(), "{}: insert assigns a timestamp", backend_name);

            let fetched = store.get("Products", "Product", "p1").await.unwrap();
            assert_eq!(fetched.fields, created.fields, "{}: fields survive", backend_name);
            assert_eq!(fetched.etag, created.etag, "{}: version survives", backend_name);

            assert!(
                matches!(store.insert("Products", product("p1", "B")).await, Err(StorageError::Conflict(_))),
                "{}: duplicate identity is a conflict",
                backend_name
            );

            store.delete("Products", "Product", "p1").await.unwrap();
            assert!(
                matches!(store.get("Products", "Product", "p1").await, Err(StorageError::NotFound(_))),
                "{}: deleted record is gone",
                backend_name
            );
            assert!(
                matches!(store.delete("Products", "Product", "p1").await, Err(StorageError::NotFound(_))),
                "{}: deleting twice is not found",
                backend_name
            );
        }
    }

    #[actix_web::test]
    async fn test_table_update_guards_version_on_all_backends() {
        for (backend_name, store) in table_backends() {
            store.ensure_table("Products").await.unwrap();
            let created = store.insert("Products", product("p1", "A")).await.unwrap();
            let v1 = created.etag.clone().unwrap();

            let updated = store
                .update("Products", product("p1", "B"), &v1, UpdateMode::Replace)
                .await
                .unwrap();
            let v2 = updated.etag.clone().unwrap();
            assert_ne!(v1, v2, "{}: update issues a new version", backend_name);

            assert!(
                matches!(
                    store.update("Products", product("p1", "C"), &v1, UpdateMode::Replace).await,
                    Err(StorageError::Conflict(_))
                ),
                "{}: stale version is rejected",
                backend_name
            );
            assert_eq!(
                store.get("Products", "Product", "p1").await.unwrap().fields["ProductName"],
                FieldValue::Text("B".into()),
                "{}: rejected update leaves the record alone",
                backend_name
            );

            assert!(
                matches!(
                    store.update("Products", product("ghost", "X"), ANY_VERSION, UpdateMode::Replace).await,
                    Err(StorageError::NotFound(_))
                ),
                "{}: update never inserts",
                backend_name
            );
            assert!(matches!(
                store.get("Products", "Product", "ghost").await,
                Err(StorageError::NotFound(_))
            ));
        }
    }

    #[actix_web::test]
    async fn test_table_replace_and_merge_on_all_backends() {
        for (backend_name, store) in table_backends() {
            store.ensure_table("Products").await.unwrap();
            let created = store
                .insert("Products", product("p1", "A").with_field("Price", FieldValue::Double(1.0)))
                .await
                .unwrap();

            let merged = store
                .update(
                    "Products",
                    Record::new("Product", "p1").with_field("StockQuantity", FieldValue::Int(3)),
                    created.etag.as_deref().unwrap(),
                    UpdateMode::Merge,
                )
                .await
                .unwrap();
            assert_eq!(merged.fields.len(), 3, "{}: merge keeps stored fields", backend_name);

            let replaced = store
                .update("Products", product("p1", "Z"), ANY_VERSION, UpdateMode::Replace)
                .await
                .unwrap();
            assert_eq!(replaced.fields.len(), 1, "{}: replace drops missing fields", backend_name);
        }
    }

    #[actix_web::test]
    async fn test_table_scan_on_all_backends() {
        for (backend_name, store) in table_backends() {
            store.ensure_table("Products").await.unwrap();
            let empty: Vec<Record> = store.scan("Products").try_collect().await.unwrap();
            assert!(empty.is_empty(), "{}: new table is empty", backend_name);

            for row in ["b", "a", "c"] {
                store.insert("Products", product(row, row)).await.unwrap();
            }
            let rows: Vec<Record> = store.scan("Products").try_collect().await.unwrap();
            let keys: Vec<&str> = rows.iter().map(|r| r.row_key.as_str()).collect();
            assert_eq!(keys, vec!["a", "b", "c"], "{}: scan yields every row in key order", backend_name);
        }
    }

    #[actix_web::test]
    async fn test_queue_on_all_backends() {
        let backends: Vec<(&str, Arc<dyn QueueStore>)> = vec![
            ("mock", Arc::new(MockQueueStore::new())),
            ("sqlite", Arc::new(SqliteQueueStore::in_memory().unwrap())),
        ];
        for (backend_name, store) in backends {
            assert!(
                matches!(store.send_message("orders", "m").await, Err(StorageError::NotFound(_))),
                "{}: sending to a missing queue fails",
                backend_name
            );
            store.ensure_queue("orders").await.unwrap();
            let receipt = store.send_message("orders", "m").await.unwrap();
            assert!(!receipt.message_id.is_empty(), "{}: receipt has an id", backend_name);
        }
    }

    #[actix_web::test]
    async fn test_file_share_on_all_backends() {
        let dir = tempfile::tempdir().unwrap();
        let backends: Vec<(&str, Arc<dyn FileShareStore>)> = vec![
            ("mock", Arc::new(MockFileShare::new())),
            ("local", Arc::new(LocalFileShare::new(dir.path()).unwrap())),
        ];
        for (backend_name, store) in backends {
            store.ensure_share("files").await.unwrap();
            store.ensure_directory("files", "logs").await.unwrap();
            store.create_file("files", "logs", "a.txt", 4).await.unwrap();
            store.write_range("files", "logs", "a.txt", 0, b"abcd").await.unwrap();
            // Creating the same name again starts from an empty file.
            store.create_file("files", "logs", "a.txt", 2).await.unwrap();
            assert!(
                store.write_range("files", "logs", "a.txt", 0, b"abcd").await.is_err(),
                "{}: recreated file has the new size",
                backend_name
            );
        }
    }

    #[actix_web::test]
    async fn test_blob_on_all_backends() {
        let dir = tempfile::tempdir().unwrap();
        let backends: Vec<(&str, Arc<dyn BlobStore>)> = vec![
            ("mock", Arc::new(MockBlobStore::new("http://blobs"))),
            ("local", Arc::new(LocalBlobStore::new(dir.path(), "http://blobs").unwrap())),
        ];
        for (backend_name, store) in backends {
            store.ensure_container("uploads", PublicAccess::Blob).await.unwrap();
            let url = store
                .upload("uploads", "n_a.png", Bytes::from_static(b"1"), Some("image/png"), true)
                .await
                .unwrap();
            assert_eq!(url, "http://blobs/uploads/n_a.png", "{}: url layout", backend_name);
            store
                .upload("uploads", "n_a.png", Bytes::from_static(b"2"), None, true)
                .await
                .expect("overwrite should succeed");

            let blob = store.download("uploads", "n_a.png").await.unwrap();
            assert_eq!(blob.data, Bytes::from_static(b"2"), "{}: latest upload wins", backend_name);
            assert_eq!(blob.content_type, None, "{}: properties are replaced", backend_name);
            assert_eq!(
                store.container_access("uploads").await.unwrap(),
                PublicAccess::Blob,
                "{}: access level is kept",
                backend_name
            );
            assert!(
                matches!(store.download("uploads", "missing").await, Err(StorageError::NotFound(_))),
                "{}: unknown blob is not found",
                backend_name
            );
        }
    }
}
