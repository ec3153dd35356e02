use std::{
    collections::HashMap,
    fmt::Write as _,
    fs,
    path::{Path, PathBuf},
};

use regex::Regex;
use walkdir::WalkDir;

use crate::error::Result;

pub const DEFAULT_DIST: &str = "dist/portfolio/browser";
pub const DEFAULT_OUTPUT: &str = "bundle-output.txt";
pub const DEFAULT_TOP: usize = 40;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileSize {
    /// Path relative to the dist directory, `/`-separated.
    pub name: String,
    pub size: u64,
}

#[derive(Clone, Debug)]
pub struct BundleReport {
    pub dist: PathBuf,
    pub modules: Vec<FileSize>,
    pub packages: Vec<FileSize>,
    pub top: usize,
}

pub struct PackageMatcher {
    pattern: Regex,
}

impl PackageMatcher {
    pub fn new() -> Self {
        PackageMatcher {
            pattern: Regex::new(r"node_modules/((?:@[^/]+/)?[^/]+)")
                .expect("package pattern is a valid regex"),
        }
    }

    /// Package a file came from, `app-src` for first-party bundles, else `other`.
    pub fn package_of(&self, name: &str) -> String {
        if let Some(captures) = self.pattern.captures(name) {
            return captures[1].to_string();
        }
        let file_name = name.rsplit('/').next().unwrap_or(name);
        if file_name.starts_with("main") || file_name.starts_with("chunk") {
            "app-src".to_string()
        } else {
            "other".to_string()
        }
    }
}

impl Default for PackageMatcher {
    fn default() -> Self {
        Self::new()
    }
}

fn is_script(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some("js") | Some("mjs")
    )
}

pub fn collect_scripts(dist: &Path) -> Result<Vec<FileSize>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dist).sort_by_file_name() {
        let entry = entry.map_err(std::io::Error::from)?;
        if !entry.file_type().is_file() || !is_script(entry.path()) {
            continue;
        }
        let size = entry.metadata().map_err(std::io::Error::from)?.len();
        let relative = entry.path().strip_prefix(dist).unwrap_or(entry.path());
        let name = relative
            .components()
            .map(|part| part.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        files.push(FileSize { name, size });
    }
    Ok(files)
}

fn sort_descending(items: &mut [FileSize]) {
    items.sort_by(|a, b| b.size.cmp(&a.size).then_with(|| a.name.cmp(&b.name)));
}

pub fn analyze(dist: &Path, top: usize) -> Result<BundleReport> {
    let mut modules = collect_scripts(dist)?;
    sort_descending(&mut modules);

    let matcher = PackageMatcher::new();
    let mut totals: HashMap<String, u64> = HashMap::new();
    for module in &modules {
        *totals.entry(matcher.package_of(&module.name)).or_default() += module.size;
    }
    let mut packages: Vec<FileSize> = totals
        .into_iter()
        .map(|(name, size)| FileSize { name, size })
        .collect();
    sort_descending(&mut packages);

    tracing::info!(
        dist = %dist.display(),
        modules = modules.len(),
        packages = packages.len(),
        "Bundle analyzed"
    );
    Ok(BundleReport {
        dist: dist.to_path_buf(),
        modules,
        packages,
        top,
    })
}

fn kb(size: u64) -> String {
    format!("{:.1} KB", size as f64 / 1024.0)
}

impl BundleReport {
    pub fn total_size(&self) -> u64 {
        self.modules.iter().map(|module| module.size).sum()
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "# TOP MODULES — SIZE KB\tMODULE_NAME");
        for module in self.modules.iter().take(self.top) {
            let _ = writeln!(out, "{}\t{}", kb(module.size), module.name);
        }
        let _ = writeln!(out, "\n# TOP PACKAGES (aggregate) — SIZE KB\tPACKAGE_NAME");
        for package in self.packages.iter().take(self.top) {
            let _ = writeln!(out, "{}\t{}", kb(package.size), package.name);
        }
        out
    }

    pub fn write_to(&self, output: &Path) -> Result<()> {
        fs::write(output, self.render())?;
        tracing::info!(
            output = %output.display(),
            dist = %self.dist.display(),
            files = self.modules.len(),
            total = %kb(self.total_size()),
            "Bundle report written"
        );
        Ok(())
    }
}
