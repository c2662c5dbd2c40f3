use codectx::ContextManager;
use criterion::{Criterion, black_box, criterion_group, criterion_main};
use std::fs;
use std::path::Path;

const MODULES: usize = 200;

fn write_module(root: &Path, idx: usize) {
    let mut source = String::new();
    if idx > 0 {
        source.push_str(&format!("from pkg.mod_{} import work_{}\n\n", idx - 1, idx - 1));
    }
    source.push_str(&format!("class Worker{idx}:\n"));
    source.push_str("    def run(self, items):\n");
    source.push_str("        total = 0\n");
    source.push_str("        for item in items:\n");
    source.push_str("            total += item\n");
    source.push_str("        return total\n\n");
    source.push_str(&format!("def work_{idx}(x):\n"));
    if idx > 0 {
        source.push_str(&format!("    return work_{}(x) + Worker{idx}().run([x])\n", idx - 1));
    } else {
        source.push_str(&format!("    return Worker{idx}().run([x])\n"));
    }
    fs::write(root.join("pkg").join(format!("mod_{idx}.py")), source).unwrap();
}

fn setup_repo() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("pkg")).unwrap();
    fs::write(dir.path().join("pkg").join("__init__.py"), "").unwrap();
    for idx in 0..MODULES {
        write_module(dir.path(), idx);
    }
    dir
}

fn bench_bulk_scan(c: &mut Criterion) {
    let repo = setup_repo();
    c.bench_function("scan_directory_cold", |b| {
        b.iter(|| {
            let manager = ContextManager::for_directory(repo.path());
            black_box(manager.scan_directory(black_box(repo.path())))
        })
    });
}

fn bench_edit_context(c: &mut Criterion) {
    let repo = setup_repo();
    let manager = ContextManager::for_directory(repo.path());
    manager.scan_directory(repo.path());

    c.bench_function("get_edit_context", |b| {
        b.iter(|| black_box(manager.get_edit_context(black_box("pkg/mod_100.py"), 5, 8)))
    });
    c.bench_function("find_references_chain", |b| {
        b.iter(|| black_box(manager.find_references(black_box("work_0"), "pkg/mod_0.py")))
    });
}

criterion_group!(benches, bench_bulk_scan, bench_edit_context);
criterion_main!(benches);
