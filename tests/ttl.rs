use caskdb::{Engine, EngineOptions, Error};
use std::{thread::sleep, time::Duration};
use test_log::test;

#[test]
fn ttl_roundtrip_then_expiry() -> caskdb::Result<()> {
    let folder = tempfile::tempdir()?;
    let engine = Engine::open(EngineOptions::new(folder.path()))?;

    engine.put(b"k", b"v", Some(1))?;
    assert_eq!(engine.get(b"k")?, b"v");

    sleep(Duration::from_millis(1_100));
    assert!(matches!(engine.get(b"k"), Err(Error::Expired)));

    Ok(())
}

#[test]
fn expired_entries_are_not_persisted() -> caskdb::Result<()> {
    let folder = tempfile::tempdir()?;

    {
        let engine = Engine::open(EngineOptions::new(folder.path()))?;
        engine.put(b"k", b"v", Some(1))?;
        sleep(Duration::from_millis(1_100));
        engine.close()?;
    }

    let engine = Engine::open(EngineOptions::new(folder.path()))?;
    assert!(matches!(engine.get(b"k"), Err(Error::NotFound)));
    Ok(())
}

#[test]
fn no_ttl_never_expires() -> caskdb::Result<()> {
    let folder = tempfile::tempdir()?;
    let engine = Engine::open(EngineOptions::new(folder.path()))?;

    engine.put(b"k", b"v", None)?;
    sleep(Duration::from_millis(1_100));
    assert_eq!(engine.get(b"k")?, b"v");
    Ok(())
}
