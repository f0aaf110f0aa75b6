use std::collections::HashMap;

use async_trait::async_trait;
use composer_core::traits::ClusterStore;
use composer_core::ComposerResult;
use redis::Script;

use super::RedisConnectionManager;

const REPLACE_SCRIPT: &str = r#"
if redis.call('HGET', KEYS[1], ARGV[1]) == ARGV[2] then
    redis.call('HSET', KEYS[1], ARGV[1], ARGV[3])
    return 1
end
return 0
"#;

const REMOVE_SCRIPT: &str = r#"
local value = redis.call('HGET', KEYS[1], ARGV[1])
if value then
    redis.call('HDEL', KEYS[1], ARGV[1])
end
return value
"#;

pub struct RedisClusterStore {
    connection: RedisConnectionManager,
    replace_script: Script,
    remove_script: Script,
}

impl RedisClusterStore {
    pub fn new(connection: RedisConnectionManager) -> Self {
        Self {
            connection,
            replace_script: Script::new(REPLACE_SCRIPT),
            remove_script: Script::new(REMOVE_SCRIPT),
        }
    }

    fn hash_key(&self, map: &str) -> String {
        self.connection.key("map", map)
    }
}

#[async_trait]
impl ClusterStore for RedisClusterStore {
    async fn get(&self, map: &str, key: &str) -> ComposerResult<Option<String>> {
        self.connection
            .execute(redis::cmd("HGET").arg(self.hash_key(map)).arg(key))
            .await
    }

    async fn put(&self, map: &str, key: &str, value: &str) -> ComposerResult<()> {
        let _: i64 = self
            .connection
            .execute(redis::cmd("HSET").arg(self.hash_key(map)).arg(key).arg(value))
            .await?;
        Ok(())
    }

    async fn put_if_absent(&self, map: &str, key: &str, value: &str) -> ComposerResult<bool> {
        let stored: i64 = self
            .connection
            .execute(
                redis::cmd("HSETNX")
                    .arg(self.hash_key(map))
                    .arg(key)
                    .arg(value),
            )
            .await?;
        Ok(stored == 1)
    }

    async fn replace(
        &self,
        map: &str,
        key: &str,
        expected: &str,
        value: &str,
    ) -> ComposerResult<bool> {
        let hash_key = self.hash_key(map);
        let replaced: i64 = self
            .connection
            .run_script(&self.replace_script, &[&hash_key], &[key, expected, value])
            .await?;
        Ok(replaced == 1)
    }

    async fn remove(&self, map: &str, key: &str) -> ComposerResult<Option<String>> {
        let hash_key = self.hash_key(map);
        self.connection
            .run_script(&self.remove_script, &[&hash_key], &[key])
            .await
    }

    async fn entries(&self, map: &str) -> ComposerResult<Vec<(String, String)>> {
        let entries: HashMap<String, String> = self
            .connection
            .execute(redis::cmd("HGETALL").arg(self.hash_key(map)))
            .await?;
        Ok(entries.into_iter().collect())
    }
}
