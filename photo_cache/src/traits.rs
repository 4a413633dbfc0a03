use common::photo::CachedPhoto;

pub(crate) trait CacheMethod {
    fn get_item(&self, cache_key: &str) -> impl Future<Output = Option<CachedPhoto>> + Send;
    fn insert_item(&self, cache_key: &str, photo: CachedPhoto) -> impl Future<Output = ()> + Send;
    fn item_count(&self) -> impl Future<Output = usize> + Send;
    fn purge_expired(&self) -> impl Future<Output = usize> + Send;
}
