use crate::error::{JppError, ParseError};
use crate::player::valid_name;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameMap {
    pub name: String,
    pub times_played: u32,
}

/// How a pool filters the full map list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MapPoolType {
    /// Every map, the pool's own list is ignored.
    All,
    /// Only the maps listed in the pool.
    Custom,
    /// Every map except those listed in the pool.
    Exclude,
}

impl fmt::Display for MapPoolType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MapPoolType::All => "All",
            MapPoolType::Custom => "Custom",
            MapPoolType::Exclude => "Exclude",
        })
    }
}

impl FromStr for MapPoolType {
    type Err = ParseError;

    /// Accepts `0`/`1`/`2`, or any text containing `all`, `custom` or `exclude`
    /// (or just their first letter).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let arg = s.trim().to_lowercase();
        if let Ok(n) = arg.parse::<i64>() {
            return match n {
                0 => Ok(MapPoolType::All),
                1 => Ok(MapPoolType::Custom),
                2 => Ok(MapPoolType::Exclude),
                _ => Err(ParseError::MapPoolType(s.to_owned())),
            };
        }
        if arg.contains("all") || arg == "a" {
            Ok(MapPoolType::All)
        } else if arg.contains("custom") || arg == "c" {
            Ok(MapPoolType::Custom)
        } else if arg.contains("exclude") || arg == "e" {
            Ok(MapPoolType::Exclude)
        } else {
            Err(ParseError::MapPoolType(s.to_owned()))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapPool {
    pub name: String,
    pub kind: MapPoolType,
    pub maps: Vec<String>,
    pub times_played: u32,
}

impl MapPool {
    pub fn new(name: impl Into<String>, kind: MapPoolType) -> Self {
        Self {
            name: name.into(),
            kind,
            maps: Vec::new(),
            times_played: 0,
        }
    }

    pub fn lists(&self, map: &str) -> bool {
        self.maps.iter().any(|m| m.eq_ignore_ascii_case(map))
    }

    pub fn is_valid_map(&self, map: &str) -> bool {
        match self.kind {
            MapPoolType::All => true,
            MapPoolType::Custom => self.lists(map),
            MapPoolType::Exclude => !self.lists(map),
        }
    }
}

/// Picks a map at random from the least played half of the maps `pool` allows.
///
/// `always_eligible` joins the candidates even when it is not among the least played.
pub fn select_map<'a, R: Rng + ?Sized>(
    maps: &'a [GameMap],
    pool: Option<&MapPool>,
    always_eligible: Option<&'a GameMap>,
    rng: &mut R,
) -> Option<&'a GameMap> {
    let mut candidates: Vec<&GameMap> = maps
        .iter()
        .filter(|m| pool.map_or(true, |p| p.is_valid_map(&m.name)))
        .collect();
    candidates.sort_by_key(|m| m.times_played);
    candidates.truncate(candidates.len().div_ceil(2));

    if let Some(extra) = always_eligible {
        if !candidates.iter().any(|m| m.name == extra.name) {
            candidates.push(extra);
        }
    }

    candidates.choose(rng).copied()
}

/// Serialized form of the catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapData {
    pub maps: Vec<GameMap>,
    pub pools: Vec<MapPool>,
    pub current_pool: Option<String>,
}

/// All maps and map pools, keyed by lowercase name.
#[derive(Debug, Clone, Default)]
pub struct MapCatalog {
    maps: BTreeMap<String, GameMap>,
    pools: BTreeMap<String, MapPool>,
    current_pool: Option<String>,
}

fn key(name: &str) -> String {
    name.trim().to_lowercase()
}

impl MapCatalog {
    pub fn from_data(data: MapData) -> Self {
        let pools: BTreeMap<_, _> = data.pools.into_iter().map(|p| (key(&p.name), p)).collect();
        let current_pool = data
            .current_pool
            .map(|p| key(&p))
            .filter(|p| pools.contains_key(p));
        Self {
            maps: data.maps.into_iter().map(|m| (key(&m.name), m)).collect(),
            pools,
            current_pool,
        }
    }

    pub fn to_data(&self) -> MapData {
        MapData {
            maps: self.maps.values().cloned().collect(),
            pools: self.pools.values().cloned().collect(),
            current_pool: self.current_pool().map(|p| p.name.clone()),
        }
    }

    /// Maps ordered by name.
    pub fn maps(&self) -> Vec<&GameMap> {
        self.maps.values().collect()
    }

    /// Pools ordered by name.
    pub fn pools(&self) -> Vec<&MapPool> {
        self.pools.values().collect()
    }

    pub fn map(&self, name: &str) -> Result<&GameMap, JppError> {
        self.maps
            .get(&key(name))
            .ok_or_else(|| JppError::InvalidMap(name.to_owned()))
    }

    pub fn pool(&self, name: &str) -> Result<&MapPool, JppError> {
        self.pools
            .get(&key(name))
            .ok_or_else(|| JppError::InvalidMapPool(name.to_owned()))
    }

    fn pool_mut(&mut self, name: &str) -> Result<&mut MapPool, JppError> {
        self.pools
            .get_mut(&key(name))
            .ok_or_else(|| JppError::InvalidMapPool(name.to_owned()))
    }

    pub fn current_pool(&self) -> Option<&MapPool> {
        self.current_pool.as_ref().and_then(|k| self.pools.get(k))
    }

    pub fn add_map(&mut self, name: &str) -> Result<&GameMap, JppError> {
        let name = valid_name(name)?;
        if let Ok(existing) = self.map(name) {
            return Err(JppError::MapExists(existing.name.clone()));
        }
        Ok(self.maps.entry(key(name)).or_insert(GameMap {
            name: name.to_owned(),
            times_played: 0,
        }))
    }

    /// Removes the map and takes it out of every pool that lists it.
    pub fn remove_map(&mut self, name: &str) -> Result<GameMap, JppError> {
        let map = self
            .maps
            .remove(&key(name))
            .ok_or_else(|| JppError::InvalidMap(name.to_owned()))?;
        for pool in self.pools.values_mut() {
            pool.maps.retain(|m| !m.eq_ignore_ascii_case(&map.name));
        }
        Ok(map)
    }

    pub fn add_pool(&mut self, name: &str, kind: MapPoolType) -> Result<&MapPool, JppError> {
        let name = valid_name(name)?;
        if let Ok(existing) = self.pool(name) {
            return Err(JppError::MapPoolExists(existing.name.clone()));
        }
        Ok(self.pools.entry(key(name)).or_insert(MapPool::new(name, kind)))
    }

    pub fn remove_pool(&mut self, name: &str) -> Result<MapPool, JppError> {
        let k = key(name);
        let pool = self
            .pools
            .remove(&k)
            .ok_or_else(|| JppError::InvalidMapPool(name.to_owned()))?;
        if self.current_pool.as_deref() == Some(k.as_str()) {
            self.current_pool = None;
        }
        Ok(pool)
    }

    pub fn set_pool_type(&mut self, name: &str, kind: MapPoolType) -> Result<&MapPool, JppError> {
        let pool = self.pool_mut(name)?;
        pool.kind = kind;
        Ok(pool)
    }

    pub fn add_pool_map(&mut self, pool: &str, map: &str) -> Result<&MapPool, JppError> {
        let map = self.map(map)?.name.clone();
        let pool = self.pool_mut(pool)?;
        if pool.lists(&map) {
            return Err(JppError::MapPoolMapExists {
                pool: pool.name.clone(),
                map,
            });
        }
        pool.maps.push(map);
        Ok(pool)
    }

    pub fn remove_pool_map(&mut self, pool: &str, map: &str) -> Result<&MapPool, JppError> {
        let pool = self.pool_mut(pool)?;
        let index = pool
            .maps
            .iter()
            .position(|m| m.eq_ignore_ascii_case(map.trim()))
            .ok_or_else(|| JppError::InvalidMapPoolMap {
                pool: pool.name.clone(),
                map: map.to_owned(),
            })?;
        pool.maps.remove(index);
        Ok(pool)
    }

    /// `None` goes back to choosing from every map.
    pub fn set_current_pool(&mut self, name: Option<&str>) -> Result<Option<&MapPool>, JppError> {
        self.current_pool = match name {
            Some(name) => Some(key(&self.pool(name)?.name)),
            None => None,
        };
        Ok(self.current_pool())
    }

    /// Chooses the next map from the current pool. `override_map` is always eligible if it exists.
    pub fn select<R: Rng + ?Sized>(
        &self,
        override_map: Option<&str>,
        rng: &mut R,
    ) -> Result<&GameMap, JppError> {
        let maps: Vec<GameMap> = self.maps.values().cloned().collect();
        let extra = override_map.and_then(|m| self.map(m).ok()).cloned();
        let chosen = select_map(&maps, self.current_pool(), extra.as_ref(), rng)
            .map(|m| key(&m.name))
            .ok_or(JppError::NoMaps)?;
        self.maps.get(&chosen).ok_or(JppError::NoMaps)
    }

    /// Counts a finished match against its map and pool. Unknown names are ignored.
    pub fn declare_played(&mut self, map: &str, pool: Option<&str>) {
        if let Some(m) = self.maps.get_mut(&key(map)) {
            m.times_played += 1;
        }
        if let Some(p) = pool.and_then(|p| self.pools.get_mut(&key(p))) {
            p.times_played += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::collections::HashSet;

    fn catalog(names: &[(&str, u32)]) -> MapCatalog {
        let mut catalog = MapCatalog::default();
        for (name, played) in names {
            catalog.add_map(name).unwrap();
            for _ in 0..*played {
                catalog.declare_played(name, None);
            }
        }
        catalog
    }

    fn picks(catalog: &MapCatalog, override_map: Option<&str>) -> HashSet<String> {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        (0..300)
            .map(|_| catalog.select(override_map, &mut rng).unwrap().name.clone())
            .collect()
    }

    #[test]
    fn pool_type_parsing() {
        assert_eq!("0".parse::<MapPoolType>().unwrap(), MapPoolType::All);
        assert_eq!("Custom".parse::<MapPoolType>().unwrap(), MapPoolType::Custom);
        assert_eq!("e".parse::<MapPoolType>().unwrap(), MapPoolType::Exclude);
        assert_eq!(
            "7".parse::<MapPoolType>().unwrap_err(),
            ParseError::MapPoolType("7".into())
        );
        assert!("ranked".parse::<MapPoolType>().is_err());
    }

    #[test]
    fn selects_only_least_played_half() {
        let catalog = catalog(&[("Bank", 0), ("Border", 1), ("Villa", 5), ("Chalet", 9)]);
        assert_eq!(
            picks(&catalog, None),
            HashSet::from(["Bank".to_owned(), "Border".to_owned()])
        );
    }

    #[test]
    fn odd_count_rounds_up() {
        let catalog = catalog(&[("Bank", 0), ("Border", 1), ("Villa", 5)]);
        assert_eq!(picks(&catalog, None).len(), 2);
    }

    #[test]
    fn override_map_is_always_eligible() {
        let catalog = catalog(&[("Bank", 0), ("Border", 1), ("Villa", 5), ("Chalet", 9)]);
        let seen = picks(&catalog, Some("villa"));
        assert!(seen.contains("Villa"));
        assert!(!seen.contains("Chalet"));
        // unknown override maps are ignored
        assert_eq!(picks(&catalog, Some("Oregon")).len(), 2);
    }

    #[test]
    fn custom_and_exclude_pools_filter() {
        let mut catalog = catalog(&[("Bank", 0), ("Border", 0), ("Villa", 0), ("Chalet", 0)]);
        catalog.add_pool("Comp", MapPoolType::Custom).unwrap();
        catalog.add_pool_map("comp", "bank").unwrap();
        catalog.add_pool_map("comp", "Villa").unwrap();
        catalog.set_current_pool(Some("COMP")).unwrap();
        for map in picks(&catalog, None) {
            assert!(map == "Bank" || map == "Villa");
        }

        catalog.set_pool_type("comp", MapPoolType::Exclude).unwrap();
        for map in picks(&catalog, None) {
            assert!(map == "Border" || map == "Chalet");
        }

        catalog.set_pool_type("comp", MapPoolType::All).unwrap();
        assert_eq!(picks(&catalog, None).len(), 2);
    }

    #[test]
    fn no_maps_is_an_error() {
        let catalog = MapCatalog::default();
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        assert_eq!(catalog.select(None, &mut rng).unwrap_err(), JppError::NoMaps);
    }

    #[test]
    fn map_and_pool_management() {
        let mut catalog = catalog(&[("Bank", 0)]);
        assert_eq!(
            catalog.add_map("BANK").unwrap_err(),
            JppError::MapExists("Bank".into())
        );
        assert_eq!(catalog.add_map(" ").unwrap_err(), JppError::EmptyName);

        catalog.add_pool("Comp", MapPoolType::Custom).unwrap();
        assert_eq!(
            catalog.add_pool("comp", MapPoolType::All).unwrap_err(),
            JppError::MapPoolExists("Comp".into())
        );
        catalog.add_pool_map("Comp", "Bank").unwrap();
        assert_eq!(
            catalog.add_pool_map("Comp", "bank").unwrap_err(),
            JppError::MapPoolMapExists {
                pool: "Comp".into(),
                map: "Bank".into()
            }
        );
        assert_eq!(
            catalog.add_pool_map("Comp", "Oregon").unwrap_err(),
            JppError::InvalidMap("Oregon".into())
        );

        catalog.remove_map("bank").unwrap();
        assert!(catalog.pool("comp").unwrap().maps.is_empty());
        assert_eq!(
            catalog.remove_pool_map("Comp", "Bank").unwrap_err(),
            JppError::InvalidMapPoolMap {
                pool: "Comp".into(),
                map: "Bank".into()
            }
        );

        catalog.set_current_pool(Some("comp")).unwrap();
        catalog.remove_pool("Comp").unwrap();
        assert!(catalog.current_pool().is_none());
    }

    #[test]
    fn declare_played_counts_map_and_pool() {
        let mut catalog = catalog(&[("Bank", 0)]);
        catalog.add_pool("Comp", MapPoolType::All).unwrap();
        catalog.declare_played("bank", Some("Comp"));
        catalog.declare_played("Nowhere", None);
        assert_eq!(catalog.map("Bank").unwrap().times_played, 1);
        assert_eq!(catalog.pool("comp").unwrap().times_played, 1);
    }

    #[test]
    fn data_round_trip_keeps_current_pool() {
        let mut catalog = catalog(&[("Bank", 2)]);
        catalog.add_pool("Comp", MapPoolType::Custom).unwrap();
        catalog.set_current_pool(Some("comp")).unwrap();
        let data = catalog.to_data();
        assert_eq!(data.current_pool.as_deref(), Some("Comp"));
        let restored = MapCatalog::from_data(data.clone());
        assert_eq!(restored.to_data(), data);
    }
}
