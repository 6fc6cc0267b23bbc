use crate::ecs::component::{TagList, GENERIC_TAGS};
use crate::ecs::list::{tag_list_name, EntityFilter, ListId};
use crate::ecs::{Entity, EntityManager};

impl EntityManager {
    fn tags_mut(&mut self, entity: Entity) -> Option<&mut TagList> {
        if !self.is_live(entity) {
            return None;
        }
        self.components
            .get_mut::<TagList>(entity.index(), GENERIC_TAGS)
    }

    /// Add a generic tag. An active entity joins the tag's list (created on
    /// first use) and is re-tested against every other list.
    pub fn tag_entity(&mut self, entity: Entity, tag: &str) {
        let Some(tags) = self.tags_mut(entity) else {
            return;
        };
        if !tags.add(tag) {
            return;
        }
        if self.is_active(entity) {
            self.updated_entities_with_tag(tag);
            self.check_active_entity(entity);
        }
    }

    pub fn tag_entities(&mut self, entities: &[Entity], tag: &str) {
        for &entity in entities {
            self.tag_entity(entity, tag);
        }
    }

    pub fn untag_entity(&mut self, entity: Entity, tag: &str) {
        let Some(tags) = self.tags_mut(entity) else {
            return;
        };
        if tags.remove(tag) {
            self.check_active_entity(entity);
        }
    }

    pub fn untag_entities(&mut self, entities: &[Entity], tag: &str) {
        for &entity in entities {
            self.untag_entity(entity, tag);
        }
    }

    pub fn entity_has_tag(&self, entity: Entity, tag: &str) -> bool {
        self.entity_ref(entity).is_some_and(|e| e.has_tag(tag))
    }

    /// List of active entities carrying `tag`, created on first request.
    pub fn updated_entities_with_tag(&mut self, tag: &str) -> ListId {
        match self.updated_entity_list_by_name(&tag_list_name(tag)) {
            Some(id) => id,
            None => self.get_updated_entity_list(EntityFilter::from_tag(tag)),
        }
    }

    /// The entity spawned with unique tag `tag`, while it lives.
    pub fn unique_tagged_entity(&self, tag: &str) -> Option<Entity> {
        self.unique.get(tag).copied()
    }
}

#[cfg(test)]
mod tests {
    use crate::ecs::manager::tests::manager_with_capacity;
    use crate::ecs::{EntityFilter, SpawnError, SpawnRequest};

    #[test]
    fn test_tagging_joins_tag_list() {
        let (mut em, _sharer) = manager_with_capacity(8);
        let e = em.spawn(SpawnRequest::new()).unwrap();
        em.tag_entity(e, "tree");
        assert!(em.entity_has_tag(e, "tree"));

        let trees = em.updated_entities_with_tag("tree");
        assert_eq!(em.list(trees).entities(), &[e]);

        em.untag_entity(e, "tree");
        assert!(!em.entity_has_tag(e, "tree"));
        assert!(em.list(trees).is_empty());
    }

    #[test]
    fn test_tag_list_back_fills_spawn_tags() {
        let (mut em, _sharer) = manager_with_capacity(8);
        let a = em.spawn(SpawnRequest::new().tag("rock")).unwrap();
        let _b = em.spawn(SpawnRequest::new().tag("tree")).unwrap();
        let rocks = em.updated_entities_with_tag("rock");
        assert_eq!(em.list(rocks).entities(), &[a]);
    }

    #[test]
    fn test_tag_change_retests_custom_filters() {
        let (mut em, _sharer) = manager_with_capacity(8);
        let list = em.get_updated_entity_list(EntityFilter::new("burning", |e| e.has_tag("fire")));
        let es: Vec<_> = (0..3).map(|_| em.spawn(SpawnRequest::new()).unwrap()).collect();
        em.tag_entities(&es[..2], "fire");
        assert_eq!(em.list(list).len(), 2);
        em.untag_entities(&es, "fire");
        assert!(em.list(list).is_empty());
    }

    #[test]
    fn test_inactive_entity_tag_applies_on_activation() {
        let (mut em, _sharer) = manager_with_capacity(8);
        let trees = em.updated_entities_with_tag("tree");
        let e = em.spawn(SpawnRequest::new().inactive()).unwrap();
        em.tag_entity(e, "tree");
        assert!(em.list(trees).is_empty());
        em.activate(e);
        assert_eq!(em.list(trees).entities(), &[e]);
    }

    #[test]
    fn test_unique_tag() {
        let (mut em, _sharer) = manager_with_capacity(8);
        let player = em.spawn(SpawnRequest::new().unique("player")).unwrap();
        assert_eq!(em.unique_tagged_entity("player"), Some(player));
        assert!(em.entity_has_tag(player, "player"));

        assert_eq!(
            em.spawn(SpawnRequest::new().unique("player")).unwrap_err(),
            SpawnError::DuplicateUniqueTag {
                tag: "player".to_string()
            }
        );

        em.despawn(player);
        assert_eq!(em.unique_tagged_entity("player"), None);
        let next = em.spawn(SpawnRequest::new().unique("player")).unwrap();
        assert_eq!(em.unique_tagged_entity("player"), Some(next));
    }
}
