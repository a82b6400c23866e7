use caskdb::{Engine, EngineOptions};
use test_log::test;

#[test]
fn smoke() -> caskdb::Result<()> {
    let folder = tempfile::tempdir()?;

    {
        let engine = Engine::open(EngineOptions::new(folder.path()))?;
        engine.put(b"foo", b"bar", None)?;
        assert_eq!(engine.get(b"foo")?, b"bar");
        engine.close()?;
    }

    let engine = Engine::open(EngineOptions::new(folder.path()))?;
    assert_eq!(engine.get(b"foo")?, b"bar");
    Ok(())
}

#[test]
fn many_keys_survive_reopen() -> caskdb::Result<()> {
    let folder = tempfile::tempdir()?;

    {
        let engine = Engine::open(EngineOptions::new(folder.path()))?;
        for i in 0..500u32 {
            engine.put(format!("key-{i}").as_bytes(), format!("value-{i}").as_bytes(), None)?;
        }
        engine.close()?;
    }

    let engine = Engine::open(EngineOptions::new(folder.path()))?;
    for i in 0..500u32 {
        let value = engine.get(format!("key-{i}").as_bytes())?;
        assert_eq!(value, format!("value-{i}").into_bytes());
    }
    Ok(())
}
