//! Page-side JavaScript evaluated over CDP by the query engine.

/// Serialized document HTML. With `include_hidden == false`, elements that
/// are not rendered are removed from the copy (the live DOM is untouched).
pub fn html_snapshot(include_hidden: bool) -> String {
    format!(
        r#"(() => {{
  const includeHidden = {include_hidden};
  if (includeHidden) return document.documentElement.outerHTML;
  const hidden = [];
  for (const el of document.querySelectorAll('body *')) {{
    const style = window.getComputedStyle(el);
    if (style.display === 'none' || style.visibility === 'hidden') {{
      el.setAttribute('data-aql-hidden', '1');
      hidden.push(el);
    }}
  }}
  const copy = document.documentElement.cloneNode(true);
  for (const el of hidden) el.removeAttribute('data-aql-hidden');
  for (const el of copy.querySelectorAll('[data-aql-hidden]')) el.remove();
  return copy.outerHTML;
}})()"#
    )
}

/// Stamp every element with a `tf623_id` attribute and return the element
/// tree as `{tf623_id, html_tag, role, name, attributes, children}` nodes.
/// Ids already present on the page are kept so earlier selectors stay valid.
pub fn element_tree(include_hidden: bool) -> String {
    format!(
        r#"(() => {{
  const includeHidden = {include_hidden};
  const skip = new Set(['script', 'style', 'noscript', 'template', 'meta', 'link']);
  const isVisible = (el) => {{
    const style = window.getComputedStyle(el);
    if (style.display === 'none' || style.visibility === 'hidden') return false;
    const rect = el.getBoundingClientRect();
    return rect.width > 0 || rect.height > 0 || el.children.length > 0;
  }};
  const ownText = (el) => {{
    let text = '';
    for (const node of el.childNodes) {{
      if (node.nodeType === Node.TEXT_NODE) text += node.textContent;
    }}
    return text.trim().slice(0, 200);
  }};
  const walk = (el) => {{
    const tag = el.tagName.toLowerCase();
    if (skip.has(tag)) return null;
    if (!includeHidden && !isVisible(el)) return null;
    let id = el.getAttribute('tf623_id');
    if (!id) {{
      window.__tf623Counter = (window.__tf623Counter || 0) + 1;
      id = String(window.__tf623Counter);
      el.setAttribute('tf623_id', id);
    }}
    const attributes = {{}};
    for (const attr of el.attributes) {{
      if (attr.name !== 'tf623_id') attributes[attr.name] = attr.value;
    }}
    const children = [];
    for (const child of el.children) {{
      const node = walk(child);
      if (node) children.push(node);
    }}
    return {{
      tf623_id: id,
      html_tag: tag,
      role: el.getAttribute('role'),
      name: el.getAttribute('aria-label') || el.getAttribute('name') || ownText(el) || null,
      attributes,
      children,
    }};
  }};
  return walk(document.documentElement);
}})()"#
    )
}
