//! Process-wide descriptor cache.

use std::any::{TypeId, type_name};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use crate::descriptor::compile;
use crate::{Result, ServiceDescriptor, ServiceInterface};

type Cache = RwLock<HashMap<TypeId, Arc<ServiceDescriptor>>>;

static CACHE: OnceLock<Cache> = OnceLock::new();

fn cache() -> &'static Cache {
    CACHE.get_or_init(Cache::default)
}

/// The compiled descriptor of `S`, compiling it on first use.
///
/// Concurrent first uses may each compile, outside the lock; the first to
/// publish wins and every caller receives that same descriptor. A failed
/// compilation is not cached.
///
/// # Errors
///
/// Returns [`crate::Error::Descriptor`] if the declaration is malformed.
pub fn descriptor<S: ServiceInterface>() -> Result<Arc<ServiceDescriptor>> {
    let key = TypeId::of::<S>();
    if let Some(found) = cache()
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&key)
    {
        return Ok(Arc::clone(found));
    }

    let compiled = Arc::new(compile(type_name::<S>(), &S::declaration())?);
    let mut map = cache().write().unwrap_or_else(PoisonError::into_inner);
    Ok(Arc::clone(map.entry(key).or_insert(compiled)))
}
