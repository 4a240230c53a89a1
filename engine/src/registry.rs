use std::sync::Arc;

use anyhow::bail;
use util::HashMap;

use crate::{ArmsType, PassabilityTable, Species, Terrain};

/// Tag lookup for content definitions during world construction.
///
/// The loader fills the registry while parsing content and resolves
/// cross-references through it. Once construction completes the
/// simulation holds direct `Arc` references and the registry is no
/// longer consulted.
#[derive(Default)]
pub struct ContentRegistry {
    terrains: HashMap<String, Arc<Terrain>>,
    pass_tables: HashMap<String, Arc<PassabilityTable>>,
    arms: HashMap<String, Arc<ArmsType>>,
    species: HashMap<String, Arc<Species>>,
}

impl ContentRegistry {
    pub fn add_terrain(
        &mut self,
        tag: impl Into<String>,
        terrain: Arc<Terrain>,
    ) -> anyhow::Result<()> {
        let tag = tag.into();
        if self.terrains.insert(tag.clone(), terrain).is_some() {
            bail!("duplicate terrain tag {tag}");
        }
        Ok(())
    }

    pub fn add_pass_table(
        &mut self,
        tag: impl Into<String>,
        table: Arc<PassabilityTable>,
    ) -> anyhow::Result<()> {
        let tag = tag.into();
        if self.pass_tables.insert(tag.clone(), table).is_some() {
            bail!("duplicate passability table tag {tag}");
        }
        Ok(())
    }

    pub fn add_arms(
        &mut self,
        tag: impl Into<String>,
        arms: Arc<ArmsType>,
    ) -> anyhow::Result<()> {
        let tag = tag.into();
        if self.arms.insert(tag.clone(), arms).is_some() {
            bail!("duplicate arms tag {tag}");
        }
        Ok(())
    }

    pub fn add_species(
        &mut self,
        tag: impl Into<String>,
        species: Arc<Species>,
    ) -> anyhow::Result<()> {
        let tag = tag.into();
        if self.species.insert(tag.clone(), species).is_some() {
            bail!("duplicate species tag {tag}");
        }
        Ok(())
    }

    pub fn terrain(&self, tag: &str) -> Option<&Arc<Terrain>> {
        self.terrains.get(tag)
    }

    pub fn pass_table(&self, tag: &str) -> Option<&Arc<PassabilityTable>> {
        self.pass_tables.get(tag)
    }

    pub fn arms(&self, tag: &str) -> Option<&Arc<ArmsType>> {
        self.arms.get(tag)
    }

    pub fn species(&self, tag: &str) -> Option<&Arc<Species>> {
        self.species.get(tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_tags_rejected() {
        let mut reg = ContentRegistry::default();
        let grass = Arc::new(Terrain::new("grass", ',', 1));

        reg.add_terrain("grass", grass.clone()).unwrap();
        assert!(reg.add_terrain("grass", grass.clone()).is_err());
        assert!(Arc::ptr_eq(reg.terrain("grass").unwrap(), &grass));
        assert!(reg.terrain("swamp").is_none());
    }
}
