//! Small walkthrough of the filesystem API over the in-memory backend.

use kvfs::{Credentials, KvFs, MemoryStore};

fn main() -> kvfs::Result<()> {
    env_logger::init();

    let store = MemoryStore::new();
    let mut fs = KvFs::mount(store.clone(), Credentials { uid: 1000, gid: 1000 })?;

    fs.mkdir("/notes", 0o755)?;
    fs.create("/notes/today", 0o644)?;
    fs.write("/notes/today", b"buy coffee\nfix the build\n")?;

    for name in fs.readdir("/notes")? {
        println!("/notes entry: {}", name);
    }

    let content = fs.read("/notes/today", 0, 1024)?;
    println!("read back {} bytes:", content.len());
    print!("{}", String::from_utf8_lossy(&content));

    let attr = fs.getattr("/notes/today")?;
    println!(
        "mode {:o} uid {} gid {} size {}",
        attr.mode, attr.uid, attr.gid, attr.size
    );

    // Drop the context and remount from the same backend.
    drop(fs);
    let fs = KvFs::mount(store, Credentials { uid: 1000, gid: 1000 })?;
    println!(
        "after remount: {} bytes still there",
        fs.read("/notes/today", 0, 1024)?.len()
    );

    Ok(())
}
