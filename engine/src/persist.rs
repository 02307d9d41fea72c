use crate::store::Document;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize, Deserialize)]
pub struct MetaFile {
    pub num_docs: u32,
    pub seed: Option<String>,
    pub created_at: String,
    pub version: u32,
}

pub struct IndexPaths {
    pub root: PathBuf,
}

impl IndexPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    pub fn docs(&self) -> PathBuf { self.root.join("docs.bin") }
    pub fn postings(&self) -> PathBuf { self.root.join("postings.bin") }
    pub fn popularity(&self) -> PathBuf { self.root.join("popularity.bin") }
    pub fn meta(&self) -> PathBuf { self.root.join("meta.json") }
}

/// Wipe the index directory when a rebuild is requested, then make sure it
/// exists. Failures here are fatal to the whole crawl.
pub fn prepare_root(paths: &IndexPaths, rebuild: bool) -> Result<()> {
    if rebuild && paths.root.exists() {
        fs::remove_dir_all(&paths.root)
            .with_context(|| format!("wiping index dir {}", paths.root.display()))?;
    }
    fs::create_dir_all(&paths.root)
        .with_context(|| format!("creating index dir {}", paths.root.display()))?;
    Ok(())
}

pub fn save_docs(paths: &IndexPaths, docs: &HashMap<String, Document>) -> Result<()> {
    let mut f = File::create(paths.docs())?;
    let bytes = bincode::serialize(docs)?;
    f.write_all(&bytes)?;
    Ok(())
}

pub fn load_docs(paths: &IndexPaths) -> Result<HashMap<String, Document>> {
    let mut f = File::open(paths.docs())?;
    let mut buf = Vec::new();
    f.read_to_end(&mut buf)?;
    let docs = bincode::deserialize(&buf)?;
    Ok(docs)
}

pub fn save_postings(paths: &IndexPaths, postings: &HashMap<String, HashMap<String, u32>>) -> Result<()> {
    let mut f = File::create(paths.postings())?;
    let bytes = bincode::serialize(postings)?;
    f.write_all(&bytes)?;
    Ok(())
}

pub fn load_postings(paths: &IndexPaths) -> Result<HashMap<String, HashMap<String, u32>>> {
    let mut f = File::open(paths.postings())?;
    let mut buf = Vec::new();
    f.read_to_end(&mut buf)?;
    let postings = bincode::deserialize(&buf)?;
    Ok(postings)
}

pub fn save_popularity(paths: &IndexPaths, scores: &HashMap<String, f64>) -> Result<()> {
    let mut f = File::create(paths.popularity())?;
    let bytes = bincode::serialize(scores)?;
    f.write_all(&bytes)?;
    Ok(())
}

pub fn load_popularity(paths: &IndexPaths) -> Result<HashMap<String, f64>> {
    let mut f = File::open(paths.popularity())?;
    let mut buf = Vec::new();
    f.read_to_end(&mut buf)?;
    let scores = bincode::deserialize(&buf)?;
    Ok(scores)
}

pub fn save_meta(paths: &IndexPaths, meta: &MetaFile) -> Result<()> {
    let mut f = File::create(paths.meta())?;
    let json = serde_json::to_string_pretty(meta)?;
    f.write_all(json.as_bytes())?;
    Ok(())
}

pub fn load_meta(paths: &IndexPaths) -> Result<MetaFile> {
    let mut f = File::open(paths.meta())?;
    let mut buf = String::new();
    f.read_to_string(&mut buf)?;
    let meta: MetaFile = serde_json::from_str(&buf)?;
    Ok(meta)
}

/// Link graph snapshot saved alongside the index so a crawl's structure can
/// be inspected after the fact.
pub fn save_link_graph(paths: &IndexPaths, graph: &HashMap<String, HashSet<String>>) -> Result<()> {
    let mut f = File::create(paths.root.join("links.json"))?;
    let json = serde_json::to_string_pretty(graph)?;
    f.write_all(json.as_bytes())?;
    Ok(())
}
