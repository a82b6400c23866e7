use caskdb::{Engine, EngineOptions};
use test_log::test;

#[test]
fn rotation_preserves_reads() -> caskdb::Result<()> {
    let folder = tempfile::tempdir()?;
    let engine = Engine::open(EngineOptions::new(folder.path()).file_max_size(4 * 1024))?;

    for i in 0..200u32 {
        engine.put(
            format!("key-{i:04}").as_bytes(),
            format!("value-{i:04}-padding").as_bytes(),
            None,
        )?;
    }

    let data_files = std::fs::read_dir(folder.path())?
        .filter_map(Result::ok)
        .filter(|entry| {
            entry
                .path()
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| ext == "data")
                .unwrap_or(false)
        })
        .count();
    assert!(data_files >= 2, "expected rotation to create multiple segments, found {data_files}");

    for i in (0..200u32).step_by(4) {
        let expected = format!("value-{i:04}-padding");
        assert_eq!(engine.get(format!("key-{i:04}").as_bytes())?, expected.into_bytes());
    }

    Ok(())
}
