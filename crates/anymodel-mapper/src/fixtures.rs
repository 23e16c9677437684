//! Hand-written mapped types for the test suites.

use std::sync::Arc;

use anymodel_store::Storage;
use anymodel_types::{Entity, MappingState, Row, Value};

use crate::collection::Collection;
use crate::mapper::Mapper;
use crate::relation::OneToMany;

#[derive(Debug)]
pub struct Hero {
    id: Value,
    name: Value,
    motto: Value,
    pub powers: Collection<SuperPower>,
    state: MappingState,
}

impl Hero {
    pub fn new(name: &str) -> Self {
        let mut hero = Self::blank();
        hero.set_field("name", Value::from(name));
        hero
    }

    fn blank() -> Self {
        Hero {
            id: Value::Null,
            name: Value::Null,
            motto: Value::Null,
            powers: Collection::default(),
            state: MappingState::new(),
        }
    }

    pub fn id(&self) -> &Value {
        &self.id
    }

    pub fn name(&self) -> &Value {
        &self.name
    }

    pub fn set_name(&mut self, name: &str) {
        self.set_field("name", Value::from(name));
    }

    pub fn set_motto(&mut self, motto: &str) {
        self.set_field("motto", Value::from(motto));
    }

    pub fn set_powers(&mut self, powers: Vec<SuperPower>) {
        self.powers = Collection::from_entities(powers);
        self.state.touch("powers");
    }
}

impl Entity for Hero {
    fn field(&self, name: &str) -> Option<Value> {
        match name {
            "id" => Some(self.id.clone()),
            "name" => Some(self.name.clone()),
            "motto" => Some(self.motto.clone()),
            _ => None,
        }
    }

    fn set_field(&mut self, name: &str, value: Value) {
        match name {
            "id" => self.id = value,
            "name" => self.name = value,
            "motto" => self.motto = value,
            _ => return,
        }
        self.state.touch(name);
    }

    fn hydrate(row: &Row) -> Self {
        let mut hero = Self::blank();
        hero.id = row.get("id").cloned().unwrap_or_default();
        hero.name = row.get("name").cloned().unwrap_or_default();
        hero.motto = row.get("motto").cloned().unwrap_or_default();
        hero
    }

    fn state(&self) -> &MappingState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut MappingState {
        &mut self.state
    }
}

pub struct SuperPower {
    id: Value,
    name: Value,
    hero_id: Value,
    state: MappingState,
}

impl SuperPower {
    pub fn new(name: &str) -> Self {
        let mut power = Self::blank();
        power.set_field("name", Value::from(name));
        power
    }

    fn blank() -> Self {
        SuperPower {
            id: Value::Null,
            name: Value::Null,
            hero_id: Value::Null,
            state: MappingState::new(),
        }
    }

    pub fn name(&self) -> &Value {
        &self.name
    }

    pub fn hero_id(&self) -> &Value {
        &self.hero_id
    }
}

impl Entity for SuperPower {
    fn field(&self, name: &str) -> Option<Value> {
        match name {
            "id" => Some(self.id.clone()),
            "name" => Some(self.name.clone()),
            "hero_id" => Some(self.hero_id.clone()),
            _ => None,
        }
    }

    fn set_field(&mut self, name: &str, value: Value) {
        match name {
            "id" => self.id = value,
            "name" => self.name = value,
            "hero_id" => self.hero_id = value,
            _ => return,
        }
        self.state.touch(name);
    }

    fn hydrate(row: &Row) -> Self {
        let mut power = Self::blank();
        power.id = row.get("id").cloned().unwrap_or_default();
        power.name = row.get("name").cloned().unwrap_or_default();
        power.hero_id = row.get("hero_id").cloned().unwrap_or_default();
        power
    }

    fn state(&self) -> &MappingState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut MappingState {
        &mut self.state
    }
}

#[derive(Debug)]
pub struct Membership {
    team: Value,
    hero: Value,
    role: Value,
    state: MappingState,
}

impl Membership {
    pub fn new(team: &str, hero: &str, role: &str) -> Self {
        let mut membership = Self::blank();
        membership.set_field("team", Value::from(team));
        membership.set_field("hero", Value::from(hero));
        membership.set_field("role", Value::from(role));
        membership
    }

    fn blank() -> Self {
        Membership {
            team: Value::Null,
            hero: Value::Null,
            role: Value::Null,
            state: MappingState::new(),
        }
    }

    pub fn role(&self) -> &Value {
        &self.role
    }

    pub fn set_role(&mut self, role: &str) {
        self.set_field("role", Value::from(role));
    }
}

impl Entity for Membership {
    fn field(&self, name: &str) -> Option<Value> {
        match name {
            "team" => Some(self.team.clone()),
            "hero" => Some(self.hero.clone()),
            "role" => Some(self.role.clone()),
            _ => None,
        }
    }

    fn set_field(&mut self, name: &str, value: Value) {
        match name {
            "team" => self.team = value,
            "hero" => self.hero = value,
            "role" => self.role = value,
            _ => return,
        }
        self.state.touch(name);
    }

    fn hydrate(row: &Row) -> Self {
        let mut membership = Self::blank();
        membership.team = row.get("team").cloned().unwrap_or_default();
        membership.hero = row.get("hero").cloned().unwrap_or_default();
        membership.role = row.get("role").cloned().unwrap_or_default();
        membership
    }

    fn state(&self) -> &MappingState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut MappingState {
        &mut self.state
    }
}

/// Wire the hero/super-power mapper pair onto one storage.
pub fn wire(storage: Arc<dyn Storage>) -> (Arc<Mapper<Hero>>, Arc<Mapper<SuperPower>>) {
    let powers = Mapper::<SuperPower>::builder("super_power")
        .fields(["name", "hero_id"])
        .build(storage.clone())
        .expect("super_power mapper");

    let heroes = Mapper::<Hero>::builder("hero")
        .fields(["name"])
        .relation(
            "powers",
            OneToMany::new(powers.clone(), |hero: &mut Hero| &mut hero.powers),
        )
        .build(storage)
        .expect("hero mapper");

    (heroes, powers)
}
