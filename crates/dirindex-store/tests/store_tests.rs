use dirindex_core::{ContentHash, EntryKind, FileEntryRecord, FolderId};
use dirindex_store::{Catalog, ErrorMemo, FolderIndex, MemoryCatalog, SledCatalog};
use std::path::{Path, PathBuf};

fn exercise_entries(catalog: &dyn Catalog) {
    assert!(catalog.entry(Path::new("/data/x.bin")).unwrap().is_none());

    let mut record = FileEntryRecord::new("/data/x.bin", EntryKind::File);
    record.size = 3;
    record.hash = Some(ContentHash::new([9; 32]));
    record.folder_id = Some(FolderId(1));
    catalog.upsert_entry(&record).unwrap();

    let stored = catalog.entry(Path::new("/data/x.bin")).unwrap().unwrap();
    assert_eq!(stored, record);
    assert_eq!(
        catalog.paths_with_hash(&ContentHash::new([9; 32])).unwrap(),
        vec![PathBuf::from("/data/x.bin")]
    );

    // A full overwrite clears every column it does not set.
    let replacement = FileEntryRecord::new("/data/x.bin", EntryKind::File);
    catalog.upsert_entry(&replacement).unwrap();
    let stored = catalog.entry(Path::new("/data/x.bin")).unwrap().unwrap();
    assert!(stored.hash.is_none());
    assert!(stored.folder_id.is_none());
    assert_eq!(catalog.entry_count().unwrap(), 1);
}

fn exercise_folders(catalog: &dyn Catalog) {
    let mut folders = FolderIndex::new(catalog);
    let leaf = folders.resolve(Path::new("/home/user/music")).unwrap();
    let count = catalog.folder_count().unwrap();
    assert_eq!(count, 4);

    assert_eq!(folders.resolve(Path::new("/home/user/music")).unwrap(), leaf);
    assert_eq!(catalog.folder_count().unwrap(), count);

    // Walk the chain back up to the root.
    let mut chain = Vec::new();
    let mut next = Some(leaf);
    while let Some(id) = next {
        let folder = catalog.folder(id).unwrap().unwrap();
        chain.push(folder.path.clone());
        next = folder.parent_id;
    }
    assert_eq!(
        chain,
        vec![
            PathBuf::from("/home/user/music"),
            PathBuf::from("/home/user"),
            PathBuf::from("/home"),
            PathBuf::from("/"),
        ]
    );
}

fn exercise_memo(catalog: &dyn Catalog) {
    let mut record = FileEntryRecord::new("/proc/kcore", EntryKind::File);
    record.error = Some("opening file: Permission denied".to_string());
    catalog.upsert_entry(&record).unwrap();

    assert!(ErrorMemo::new(catalog, false).should_skip(Path::new("/proc/kcore")).unwrap());
    assert!(!ErrorMemo::new(catalog, true).should_skip(Path::new("/proc/kcore")).unwrap());
}

#[test]
fn test_memory_catalog_contract() {
    exercise_entries(&MemoryCatalog::new());
    exercise_folders(&MemoryCatalog::new());
    exercise_memo(&MemoryCatalog::new());
}

#[test]
fn test_sled_catalog_contract() {
    exercise_entries(&SledCatalog::temporary().unwrap());
    exercise_folders(&SledCatalog::temporary().unwrap());
    exercise_memo(&SledCatalog::temporary().unwrap());
}

#[test]
fn test_sled_catalog_survives_reopen() {
    let temp = tempfile::TempDir::new().unwrap();
    let db_path = temp.path().join("index.db");

    let folder_id = {
        let catalog = SledCatalog::open(&db_path).unwrap();
        let id = FolderIndex::new(&catalog).resolve(Path::new("/srv/www")).unwrap();
        let record = FileEntryRecord::new("/srv/www/index.html", EntryKind::File)
            .with_folder(Some(id));
        catalog.upsert_entry(&record).unwrap();
        catalog.flush().unwrap();
        id
    };

    let catalog = SledCatalog::open(&db_path).unwrap();
    let stored = catalog.entry(Path::new("/srv/www/index.html")).unwrap().unwrap();
    assert_eq!(stored.folder_id, Some(folder_id));

    let mut folders = FolderIndex::new(&catalog);
    assert_eq!(folders.resolve(Path::new("/srv/www")).unwrap(), folder_id);
    assert_eq!(folders.inserted(), 0);
}
