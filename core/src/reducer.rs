use crate::error::IndexResult;
use crate::persist::{list_term_shards, load_term_shard, save_index_shard, ShardPaths};
use crate::{IndexKey, InvertedIndexShard, TermFrequencyShard};

/// Fold the terms owned by `key` from every `(document, shard)` pair.
pub fn collect<'a, I>(key: IndexKey, shards: I) -> InvertedIndexShard
where
    I: IntoIterator<Item = (&'a str, &'a TermFrequencyShard)>,
{
    let mut index = InvertedIndexShard::new();
    for (document, terms) in shards {
        for (term, &count) in terms.iter().filter(|(t, _)| key.owns(t)) {
            index.entry(term.clone()).or_default().insert(document.to_string(), count);
        }
    }
    index
}

/// Build and persist the inverted index shard for `key` from all map shards.
///
/// Fails with `MissingShards` before writing anything when the temp directory
/// has no shards.
pub fn reduce_key(paths: &ShardPaths, key: IndexKey) -> IndexResult<InvertedIndexShard> {
    let listed = list_term_shards(paths)?;
    let mut loaded = Vec::with_capacity(listed.len());
    for (document, path) in listed {
        let shard = load_term_shard(&path)?;
        loaded.push((document, shard));
    }
    let index = collect(key, loaded.iter().map(|(d, s)| (d.as_str(), s)));
    let file = save_index_shard(paths, key, &index)?;
    tracing::debug!(%key, terms = index.len(), shard = %file.display(), "reduced key");
    Ok(index)
}
