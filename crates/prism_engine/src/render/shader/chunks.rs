//! Built-in GLSL chunks and program templates
//!
//! Templates assemble a program from chunks with `#include <name>`. Feature
//! toggles are `#ifdef` blocks keyed by the defines the program prefix emits.

const COMMON: &str = r"
#define PI 3.141592653589793
#define RECIPROCAL_PI 0.3183098861837907
#define EPSILON 1e-6
#define saturate(a) clamp(a, 0.0, 1.0)

float pow2(const in float x) { return x * x; }
vec3 inverseTransformDirection(in vec3 dir, in mat4 matrix) {
    return normalize((vec4(dir, 0.0) * matrix).xyz);
}
";

const PACKING: &str = r"
vec4 packDepthToRGBA(const in float v) {
    vec4 r = vec4(fract(v * vec4(16777216.0, 65536.0, 256.0, 1.0)));
    r.yzw -= r.xyz * (1.0 / 256.0);
    return r;
}
float unpackRGBAToDepth(const in vec4 v) {
    return dot(v, vec4(1.0 / 16777216.0, 1.0 / 65536.0, 1.0 / 256.0, 1.0));
}
";

const UV_PARS_VERTEX: &str = r"
#ifdef USE_UV
out vec2 vUv;
uniform mat3 mapTransform;
#endif
";

const UV_VERTEX: &str = r"
#ifdef USE_UV
vUv = (mapTransform * vec3(uv, 1.0)).xy;
#endif
";

const UV_PARS_FRAGMENT: &str = r"
#ifdef USE_UV
in vec2 vUv;
#endif
";

const COLOR_PARS_VERTEX: &str = r"
#ifdef USE_COLOR
out vec3 vColor;
#endif
";

const COLOR_VERTEX: &str = r"
#ifdef USE_COLOR
vColor = vec3(1.0);
#endif
#ifdef USE_VERTEX_COLOR
vColor *= color;
#endif
#ifdef USE_INSTANCING_COLOR
vColor *= instanceColor;
#endif
";

const COLOR_PARS_FRAGMENT: &str = r"
#ifdef USE_COLOR
in vec3 vColor;
#endif
";

const COLOR_FRAGMENT: &str = r"
#ifdef USE_COLOR
diffuseColor.rgb *= vColor;
#endif
";

const MORPHTARGET_PARS_VERTEX: &str = r"
#ifdef USE_MORPHTARGETS
uniform float morphTargetBaseInfluence;
uniform float morphTargetInfluences[MORPHTARGETS_COUNT];
#endif
";

const MORPHTARGET_VERTEX: &str = r"
#ifdef USE_MORPHTARGETS
transformed *= morphTargetBaseInfluence;
MORPHTARGETS_APPLY(transformed)
#endif
";

const SKINNING_PARS_VERTEX: &str = r"
#ifdef USE_SKINNING
uniform mat4 bindMatrix;
uniform mat4 bindMatrixInverse;
uniform mat4 boneMatrices[MAX_BONES];
#endif
";

const SKINNING_VERTEX: &str = r"
#ifdef USE_SKINNING
vec4 skinVertex = bindMatrix * vec4(transformed, 1.0);
vec4 skinned = vec4(0.0);
skinned += boneMatrices[int(skinIndex.x)] * skinVertex * skinWeight.x;
skinned += boneMatrices[int(skinIndex.y)] * skinVertex * skinWeight.y;
skinned += boneMatrices[int(skinIndex.z)] * skinVertex * skinWeight.z;
skinned += boneMatrices[int(skinIndex.w)] * skinVertex * skinWeight.w;
transformed = (bindMatrixInverse * skinned).xyz;
#endif
";

const BEGIN_VERTEX: &str = r"
vec3 transformed = vec3(position);
";

const BEGINNORMAL_VERTEX: &str = r"
vec3 objectNormal = vec3(normal);
";

const DEFAULTNORMAL_VERTEX: &str = r"
vec3 transformedNormal = objectNormal;
#ifdef USE_INSTANCING
transformedNormal = mat3(instanceMatrix) * transformedNormal;
#endif
transformedNormal = normalMatrix * transformedNormal;
#ifdef FLIP_SIDED
transformedNormal = -transformedNormal;
#endif
";

const PROJECT_VERTEX: &str = r"
vec4 mvPosition = vec4(transformed, 1.0);
#ifdef USE_INSTANCING
mvPosition = instanceMatrix * mvPosition;
#endif
mvPosition = modelViewMatrix * mvPosition;
gl_Position = projectionMatrix * mvPosition;
";

const WORLDPOS_VERTEX: &str = r"
vec4 worldPosition = vec4(transformed, 1.0);
#ifdef USE_INSTANCING
worldPosition = instanceMatrix * worldPosition;
#endif
worldPosition = modelMatrix * worldPosition;
";

const CLIPPING_PLANES_PARS_VERTEX: &str = r"
#if NUM_CLIPPING_PLANES > 0
out vec3 vClipPosition;
#endif
";

const CLIPPING_PLANES_VERTEX: &str = r"
#if NUM_CLIPPING_PLANES > 0
vClipPosition = -mvPosition.xyz;
#endif
";

const CLIPPING_PLANES_PARS_FRAGMENT: &str = r"
#if NUM_CLIPPING_PLANES > 0
in vec3 vClipPosition;
uniform vec4 clippingPlanes[NUM_CLIPPING_PLANES];
#endif
";

const CLIPPING_PLANES_FRAGMENT: &str = r"
#if NUM_CLIPPING_PLANES > 0
for (int i = 0; i < UNION_CLIPPING_PLANES; i++) {
    vec4 plane = clippingPlanes[i];
    if (dot(vClipPosition, plane.xyz) > plane.w) discard;
}
#if UNION_CLIPPING_PLANES < NUM_CLIPPING_PLANES
bool clipped = true;
for (int i = UNION_CLIPPING_PLANES; i < NUM_CLIPPING_PLANES; i++) {
    vec4 plane = clippingPlanes[i];
    clipped = (dot(vClipPosition, plane.xyz) > plane.w) && clipped;
}
if (clipped) discard;
#endif
#endif
";

const FOG_PARS_VERTEX: &str = r"
#ifdef USE_FOG
out float vFogDepth;
#endif
";

const FOG_VERTEX: &str = r"
#ifdef USE_FOG
vFogDepth = -mvPosition.z;
#endif
";

const FOG_PARS_FRAGMENT: &str = r"
#ifdef USE_FOG
uniform vec3 fogColor;
in float vFogDepth;
#ifdef FOG_EXP2
uniform float fogDensity;
#else
uniform float fogNear;
uniform float fogFar;
#endif
#endif
";

const FOG_FRAGMENT: &str = r"
#ifdef USE_FOG
#ifdef FOG_EXP2
float fogFactor = 1.0 - exp(-fogDensity * fogDensity * vFogDepth * vFogDepth);
#else
float fogFactor = smoothstep(fogNear, fogFar, vFogDepth);
#endif
gl_FragColor.rgb = mix(gl_FragColor.rgb, fogColor, fogFactor);
#endif
";

const MAP_PARS_FRAGMENT: &str = r"
#ifdef USE_MAP
uniform sampler2D map;
#endif
#ifdef USE_ALPHAMAP
uniform sampler2D alphaMap;
#endif
";

const MAP_FRAGMENT: &str = r"
#ifdef USE_MAP
diffuseColor *= texture(map, vUv);
#endif
#ifdef USE_ALPHAMAP
diffuseColor.a *= texture(alphaMap, vUv).g;
#endif
";

const ALPHATEST_FRAGMENT: &str = r"
#ifdef USE_ALPHATEST
if (diffuseColor.a < alphaTest) discard;
#endif
";

const EMISSIVEMAP_FRAGMENT: &str = r"
#ifdef USE_EMISSIVEMAP
totalEmissiveRadiance *= texture(emissiveMap, vUv).rgb;
#endif
";

const ROUGHNESSMAP_FRAGMENT: &str = r"
float roughnessFactor = roughness;
#ifdef USE_ROUGHNESSMAP
roughnessFactor *= texture(roughnessMap, vUv).g;
#endif
";

const METALNESSMAP_FRAGMENT: &str = r"
float metalnessFactor = metalness;
#ifdef USE_METALNESSMAP
metalnessFactor *= texture(metalnessMap, vUv).b;
#endif
";

const AOMAP_FRAGMENT: &str = r"
#ifdef USE_AOMAP
float ambientOcclusion = texture(aoMap, vUv).r;
reflectedLight.indirectDiffuse *= ambientOcclusion;
#endif
";

const NORMAL_PARS_FRAGMENT: &str = r"
in vec3 vNormal;
in vec3 vViewPosition;
#ifdef USE_NORMALMAP
uniform sampler2D normalMap;
uniform vec2 normalScale;
#endif
";

const NORMAL_FRAGMENT_BEGIN: &str = r"
#ifdef FLAT_SHADED
vec3 normal = normalize(cross(dFdx(vViewPosition), dFdy(vViewPosition)));
#else
vec3 normal = normalize(vNormal);
#ifdef DOUBLE_SIDED
normal *= gl_FrontFacing ? 1.0 : -1.0;
#endif
#endif
";

const NORMAL_FRAGMENT_MAPS: &str = r"
#ifdef USE_NORMALMAP
vec3 mapN = texture(normalMap, vUv).xyz * 2.0 - 1.0;
mapN.xy *= normalScale;
vec3 q0 = dFdx(-vViewPosition);
vec3 q1 = dFdy(-vViewPosition);
vec2 st0 = dFdx(vUv);
vec2 st1 = dFdy(vUv);
vec3 T = normalize(q0 * st1.t - q1 * st0.t);
vec3 B = -normalize(cross(normal, T));
normal = normalize(mat3(T, B, normal) * mapN);
#endif
";

const LIGHTS_PARS_BEGIN: &str = r"
uniform vec3 ambientLightColor;
#if NUM_DIR_LIGHTS > 0
struct DirectionalLight { vec3 direction; vec3 color; };
uniform DirectionalLight directionalLights[NUM_DIR_LIGHTS];
#endif
#if NUM_POINT_LIGHTS > 0
struct PointLight { vec3 position; vec3 color; float distance; float decay; };
uniform PointLight pointLights[NUM_POINT_LIGHTS];
#endif
#if NUM_SPOT_LIGHTS > 0
struct SpotLight { vec3 position; vec3 direction; vec3 color; float distance; float decay; float coneCos; float penumbraCos; };
uniform SpotLight spotLights[NUM_SPOT_LIGHTS];
#endif
#if NUM_HEMI_LIGHTS > 0
struct HemisphereLight { vec3 direction; vec3 skyColor; vec3 groundColor; };
uniform HemisphereLight hemisphereLights[NUM_HEMI_LIGHTS];
#endif
float getDistanceAttenuation(const in float lightDistance, const in float cutoffDistance, const in float decayExponent) {
    float distanceFalloff = 1.0 / max(pow(lightDistance, decayExponent), 0.01);
    if (cutoffDistance > 0.0) {
        distanceFalloff *= pow2(saturate(1.0 - pow2(pow2(lightDistance / cutoffDistance))));
    }
    return distanceFalloff;
}
";

const LIGHTS_FRAGMENT_BEGIN: &str = r"
vec3 directLight = vec3(0.0);
vec3 irradiance = ambientLightColor;
#if NUM_DIR_LIGHTS > 0
for (int i = 0; i < NUM_DIR_LIGHTS; i++) {
    float dotNL = saturate(dot(normal, directionalLights[i].direction));
    directLight += dotNL * directionalLights[i].color;
}
#endif
#if NUM_POINT_LIGHTS > 0
for (int i = 0; i < NUM_POINT_LIGHTS; i++) {
    vec3 lVector = pointLights[i].position + vViewPosition;
    float attenuation = getDistanceAttenuation(length(lVector), pointLights[i].distance, pointLights[i].decay);
    directLight += saturate(dot(normal, normalize(lVector))) * pointLights[i].color * attenuation;
}
#endif
#if NUM_SPOT_LIGHTS > 0
for (int i = 0; i < NUM_SPOT_LIGHTS; i++) {
    vec3 lVector = spotLights[i].position + vViewPosition;
    vec3 lDir = normalize(lVector);
    float spotEffect = smoothstep(spotLights[i].coneCos, spotLights[i].penumbraCos, dot(lDir, spotLights[i].direction));
    float attenuation = getDistanceAttenuation(length(lVector), spotLights[i].distance, spotLights[i].decay);
    directLight += saturate(dot(normal, lDir)) * spotLights[i].color * attenuation * spotEffect;
}
#endif
#if NUM_HEMI_LIGHTS > 0
for (int i = 0; i < NUM_HEMI_LIGHTS; i++) {
    float hemiWeight = 0.5 * dot(normal, hemisphereLights[i].direction) + 0.5;
    irradiance += mix(hemisphereLights[i].groundColor, hemisphereLights[i].skyColor, hemiWeight);
}
#endif
";

const SHADOWMAP_PARS_VERTEX: &str = r"
#ifdef USE_SHADOWMAP
#if NUM_DIR_LIGHT_SHADOWS > 0
uniform mat4 directionalShadowMatrix[NUM_DIR_LIGHT_SHADOWS];
out vec4 vDirectionalShadowCoord[NUM_DIR_LIGHT_SHADOWS];
#endif
#if NUM_SPOT_LIGHT_SHADOWS > 0
uniform mat4 spotShadowMatrix[NUM_SPOT_LIGHT_SHADOWS];
out vec4 vSpotShadowCoord[NUM_SPOT_LIGHT_SHADOWS];
#endif
#if NUM_POINT_LIGHT_SHADOWS > 0
uniform mat4 pointShadowMatrix[NUM_POINT_LIGHT_SHADOWS];
out vec4 vPointShadowCoord[NUM_POINT_LIGHT_SHADOWS];
#endif
#endif
";

const SHADOWMAP_VERTEX: &str = r"
#ifdef USE_SHADOWMAP
#if NUM_DIR_LIGHT_SHADOWS > 0
for (int i = 0; i < NUM_DIR_LIGHT_SHADOWS; i++) {
    vDirectionalShadowCoord[i] = directionalShadowMatrix[i] * worldPosition;
}
#endif
#if NUM_SPOT_LIGHT_SHADOWS > 0
for (int i = 0; i < NUM_SPOT_LIGHT_SHADOWS; i++) {
    vSpotShadowCoord[i] = spotShadowMatrix[i] * worldPosition;
}
#endif
#if NUM_POINT_LIGHT_SHADOWS > 0
for (int i = 0; i < NUM_POINT_LIGHT_SHADOWS; i++) {
    vPointShadowCoord[i] = pointShadowMatrix[i] * worldPosition;
}
#endif
#endif
";

const SHADOWMAP_PARS_FRAGMENT: &str = r"
#ifdef USE_SHADOWMAP
#if NUM_DIR_LIGHT_SHADOWS > 0
uniform sampler2D directionalShadowMap[NUM_DIR_LIGHT_SHADOWS];
in vec4 vDirectionalShadowCoord[NUM_DIR_LIGHT_SHADOWS];
#endif
#if NUM_SPOT_LIGHT_SHADOWS > 0
uniform sampler2D spotShadowMap[NUM_SPOT_LIGHT_SHADOWS];
in vec4 vSpotShadowCoord[NUM_SPOT_LIGHT_SHADOWS];
#endif
#if NUM_POINT_LIGHT_SHADOWS > 0
uniform sampler2D pointShadowMap[NUM_POINT_LIGHT_SHADOWS];
in vec4 vPointShadowCoord[NUM_POINT_LIGHT_SHADOWS];
#endif
uniform float shadowBias;
float getShadow(sampler2D shadowMap, vec4 shadowCoord) {
    vec3 coord = shadowCoord.xyz / shadowCoord.w;
    coord.z += shadowBias;
#ifdef SHADOWMAP_TYPE_BASIC
    return step(coord.z, unpackRGBAToDepth(texture(shadowMap, coord.xy)));
#else
    vec2 texel = vec2(1.0) / vec2(textureSize(shadowMap, 0));
    float shadow = 0.0;
    for (int x = -1; x <= 1; x++) {
        for (int y = -1; y <= 1; y++) {
            shadow += step(coord.z, unpackRGBAToDepth(texture(shadowMap, coord.xy + vec2(x, y) * texel)));
        }
    }
    return shadow / 9.0;
#endif
}
#endif
";

const SHADOWMASK_FRAGMENT: &str = r"
float shadowMask = 1.0;
#ifdef USE_SHADOWMAP
#if NUM_DIR_LIGHT_SHADOWS > 0
shadowMask *= getShadow(directionalShadowMap[0], vDirectionalShadowCoord[0]);
#endif
#if NUM_SPOT_LIGHT_SHADOWS > 0
shadowMask *= getShadow(spotShadowMap[0], vSpotShadowCoord[0]);
#endif
#endif
";

const TRANSMISSION_PARS_FRAGMENT: &str = r"
#ifdef USE_TRANSMISSION
uniform float transmission;
uniform float thickness;
uniform float ior;
uniform sampler2D transmissionSamplerMap;
uniform vec2 transmissionSamplerSize;
#ifdef USE_TRANSMISSIONMAP
uniform sampler2D transmissionMap;
#endif
#endif
";

const TRANSMISSION_FRAGMENT: &str = r"
#ifdef USE_TRANSMISSION
float transmissionFactor = transmission;
#ifdef USE_TRANSMISSIONMAP
transmissionFactor *= texture(transmissionMap, vUv).r;
#endif
vec2 refractionUv = gl_FragCoord.xy / transmissionSamplerSize;
refractionUv += normal.xy * thickness * (1.0 - 1.0 / ior) * 0.05;
vec3 transmitted = texture(transmissionSamplerMap, refractionUv).rgb * diffuseColor.rgb;
outgoingLight = mix(outgoingLight, transmitted, transmissionFactor);
#endif
";

const TONEMAPPING_PARS_FRAGMENT: &str = r"
uniform float toneMappingExposure;
vec3 LinearToneMapping(vec3 color) { return saturate(toneMappingExposure * color); }
vec3 ReinhardToneMapping(vec3 color) { color *= toneMappingExposure; return saturate(color / (vec3(1.0) + color)); }
vec3 CineonToneMapping(vec3 color) {
    color *= toneMappingExposure;
    color = max(vec3(0.0), color - 0.004);
    return pow((color * (6.2 * color + 0.5)) / (color * (6.2 * color + 1.7) + 0.06), vec3(2.2));
}
vec3 ACESFilmicToneMapping(vec3 color) {
    color *= toneMappingExposure / 0.6;
    return saturate((color * (2.51 * color + 0.03)) / (color * (2.43 * color + 0.59) + 0.14));
}
vec3 AgXToneMapping(vec3 color) { color *= toneMappingExposure; return saturate(color / (color + vec3(0.155)) * 1.019); }
vec3 NeutralToneMapping(vec3 color) { color *= toneMappingExposure; return saturate(color / (vec3(1.0) + color) * 1.2); }
";

const TONEMAPPING_FRAGMENT: &str = r"
#if defined(TONE_MAPPING)
gl_FragColor.rgb = toneMapping(gl_FragColor.rgb);
#endif
";

const COLORSPACE_PARS_FRAGMENT: &str = r"
vec4 sRGBTransferOETF(in vec4 value) {
    return vec4(mix(pow(value.rgb, vec3(0.41666)) * 1.055 - vec3(0.055), value.rgb * 12.92, vec3(lessThanEqual(value.rgb, vec3(0.0031308)))), value.a);
}
vec4 LinearTransferOETF(in vec4 value) { return value; }
";

const COLORSPACE_FRAGMENT: &str = r"
gl_FragColor = linearToOutputTexel(gl_FragColor);
";

const PREMULTIPLIED_ALPHA_FRAGMENT: &str = r"
#ifdef PREMULTIPLIED_ALPHA
gl_FragColor.rgb *= gl_FragColor.a;
#endif
";

const DITHERING_FRAGMENT: &str = r"
#ifdef DITHERING
float dither = fract(sin(dot(gl_FragCoord.xy, vec2(12.9898, 78.233))) * 43758.5453);
gl_FragColor.rgb += (dither - 0.5) / 255.0;
#endif
";

const OPAQUE_FRAGMENT: &str = r"
#ifdef OPAQUE
diffuseColor.a = 1.0;
#endif
gl_FragColor = vec4(outgoingLight, diffuseColor.a);
";

const MESH_VERTEX_PARS: &str = r"
#include <common>
#include <uv_pars_vertex>
#include <color_pars_vertex>
#include <fog_pars_vertex>
#include <morphtarget_pars_vertex>
#include <skinning_pars_vertex>
#include <shadowmap_pars_vertex>
#include <clipping_planes_pars_vertex>
";

const MESH_VERTEX_BODY: &str = r"
#include <uv_vertex>
#include <color_vertex>
#include <beginnormal_vertex>
#include <defaultnormal_vertex>
#include <begin_vertex>
#include <morphtarget_vertex>
#include <skinning_vertex>
#include <project_vertex>
#include <clipping_planes_vertex>
#include <worldpos_vertex>
#include <shadowmap_vertex>
#include <fog_vertex>
";

const MESH_FRAGMENT_PARS: &str = r"
#include <common>
#include <packing>
#include <uv_pars_fragment>
#include <color_pars_fragment>
#include <map_pars_fragment>
#include <fog_pars_fragment>
#include <clipping_planes_pars_fragment>
";

const MESH_FRAGMENT_END: &str = r"
#include <premultiplied_alpha_fragment>
#include <tonemapping_fragment>
#include <colorspace_fragment>
#include <fog_fragment>
#include <dithering_fragment>
";

const BASIC_VERT: &str = r"
#include <mesh_vertex_pars>
void main() {
#include <mesh_vertex_body>
}
";

const BASIC_FRAG: &str = r"
uniform vec3 diffuse;
uniform float opacity;
#ifdef USE_ALPHATEST
uniform float alphaTest;
#endif
#include <mesh_fragment_pars>
void main() {
#include <clipping_planes_fragment>
    vec4 diffuseColor = vec4(diffuse, opacity);
#include <map_fragment>
#include <color_fragment>
#include <alphatest_fragment>
    vec3 outgoingLight = diffuseColor.rgb;
#include <opaque_fragment>
#include <mesh_fragment_end>
}
";

const LIT_VERT: &str = r"
out vec3 vNormal;
out vec3 vViewPosition;
#include <mesh_vertex_pars>
void main() {
#include <mesh_vertex_body>
    vNormal = normalize(transformedNormal);
    vViewPosition = -mvPosition.xyz;
}
";

const LAMBERT_FRAG: &str = r"
uniform vec3 diffuse;
uniform vec3 emissive;
uniform float opacity;
#ifdef USE_ALPHATEST
uniform float alphaTest;
#endif
#ifdef USE_EMISSIVEMAP
uniform sampler2D emissiveMap;
#endif
#include <mesh_fragment_pars>
#include <normal_pars_fragment>
#include <lights_pars_begin>
#include <shadowmap_pars_fragment>
void main() {
#include <clipping_planes_fragment>
    vec4 diffuseColor = vec4(diffuse, opacity);
    vec3 totalEmissiveRadiance = emissive;
#include <map_fragment>
#include <color_fragment>
#include <alphatest_fragment>
#include <normal_fragment_begin>
#include <normal_fragment_maps>
#include <emissivemap_fragment>
#include <shadowmask_fragment>
#include <lights_fragment_begin>
    vec3 outgoingLight = diffuseColor.rgb * (irradiance + directLight * shadowMask) * RECIPROCAL_PI * PI + totalEmissiveRadiance;
#include <opaque_fragment>
#include <mesh_fragment_end>
}
";

const PHONG_FRAG: &str = r"
uniform vec3 diffuse;
uniform vec3 emissive;
uniform vec3 specular;
uniform float shininess;
uniform float opacity;
#ifdef USE_ALPHATEST
uniform float alphaTest;
#endif
#ifdef USE_EMISSIVEMAP
uniform sampler2D emissiveMap;
#endif
#ifdef USE_SPECULARMAP
uniform sampler2D specularMap;
#endif
#include <mesh_fragment_pars>
#include <normal_pars_fragment>
#include <lights_pars_begin>
#include <shadowmap_pars_fragment>
void main() {
#include <clipping_planes_fragment>
    vec4 diffuseColor = vec4(diffuse, opacity);
    vec3 totalEmissiveRadiance = emissive;
#include <map_fragment>
#include <color_fragment>
#include <alphatest_fragment>
#include <normal_fragment_begin>
#include <normal_fragment_maps>
#include <emissivemap_fragment>
#include <shadowmask_fragment>
#include <lights_fragment_begin>
    float specularStrength = 1.0;
#ifdef USE_SPECULARMAP
    specularStrength = texture(specularMap, vUv).r;
#endif
    vec3 viewDir = normalize(vViewPosition);
    float specularTerm = pow(saturate(dot(normal, viewDir)), shininess) * specularStrength;
    vec3 outgoingLight = diffuseColor.rgb * (irradiance + directLight * shadowMask) + specular * specularTerm + totalEmissiveRadiance;
#include <opaque_fragment>
#include <mesh_fragment_end>
}
";

const STANDARD_FRAG: &str = r"
uniform vec3 diffuse;
uniform vec3 emissive;
uniform float roughness;
uniform float metalness;
uniform float opacity;
#ifdef USE_ALPHATEST
uniform float alphaTest;
#endif
#ifdef USE_EMISSIVEMAP
uniform sampler2D emissiveMap;
#endif
#ifdef USE_ROUGHNESSMAP
uniform sampler2D roughnessMap;
#endif
#ifdef USE_METALNESSMAP
uniform sampler2D metalnessMap;
#endif
#ifdef USE_AOMAP
uniform sampler2D aoMap;
#endif
#ifdef USE_ENVMAP
uniform sampler2D envMap;
uniform float envMapIntensity;
#endif
#ifdef PHYSICAL
uniform float clearcoat;
uniform float clearcoatRoughness;
uniform vec3 sheenColor;
#endif
#include <mesh_fragment_pars>
#include <normal_pars_fragment>
#include <lights_pars_begin>
#include <shadowmap_pars_fragment>
#include <transmission_pars_fragment>
struct ReflectedLight { vec3 directDiffuse; vec3 indirectDiffuse; };
void main() {
#include <clipping_planes_fragment>
    vec4 diffuseColor = vec4(diffuse, opacity);
    vec3 totalEmissiveRadiance = emissive;
#include <map_fragment>
#include <color_fragment>
#include <alphatest_fragment>
#include <roughnessmap_fragment>
#include <metalnessmap_fragment>
#include <normal_fragment_begin>
#include <normal_fragment_maps>
#include <emissivemap_fragment>
#include <shadowmask_fragment>
#include <lights_fragment_begin>
    ReflectedLight reflectedLight = ReflectedLight(directLight * shadowMask, irradiance);
#include <aomap_fragment>
    vec3 albedo = diffuseColor.rgb * (1.0 - metalnessFactor);
    float specularWeight = mix(0.04, 1.0, metalnessFactor) * (1.0 - roughnessFactor * 0.5);
    vec3 outgoingLight = albedo * (reflectedLight.directDiffuse + reflectedLight.indirectDiffuse) + vec3(specularWeight) * reflectedLight.directDiffuse + totalEmissiveRadiance;
#ifdef PHYSICAL
    outgoingLight += sheenColor * (1.0 - roughnessFactor) * 0.25 + vec3(clearcoat * (1.0 - clearcoatRoughness) * 0.04);
#endif
#include <transmission_fragment>
#include <opaque_fragment>
#include <mesh_fragment_end>
}
";

const DEPTH_VERT: &str = r"
#include <common>
#include <morphtarget_pars_vertex>
#include <skinning_pars_vertex>
#include <clipping_planes_pars_vertex>
out vec2 vHighPrecisionZW;
void main() {
#include <begin_vertex>
#include <morphtarget_vertex>
#include <skinning_vertex>
#include <project_vertex>
#include <clipping_planes_vertex>
    vHighPrecisionZW = gl_Position.zw;
}
";

const DEPTH_FRAG: &str = r"
#include <common>
#include <packing>
#include <clipping_planes_pars_fragment>
in vec2 vHighPrecisionZW;
void main() {
#include <clipping_planes_fragment>
    float fragCoordZ = 0.5 * vHighPrecisionZW[0] / vHighPrecisionZW[1] + 0.5;
    gl_FragColor = packDepthToRGBA(fragCoordZ);
}
";

/// Named chunks available to `#include <name>`
pub const CHUNKS: &[(&str, &str)] = &[
    ("common", COMMON),
    ("packing", PACKING),
    ("uv_pars_vertex", UV_PARS_VERTEX),
    ("uv_vertex", UV_VERTEX),
    ("uv_pars_fragment", UV_PARS_FRAGMENT),
    ("color_pars_vertex", COLOR_PARS_VERTEX),
    ("color_vertex", COLOR_VERTEX),
    ("color_pars_fragment", COLOR_PARS_FRAGMENT),
    ("color_fragment", COLOR_FRAGMENT),
    ("morphtarget_pars_vertex", MORPHTARGET_PARS_VERTEX),
    ("morphtarget_vertex", MORPHTARGET_VERTEX),
    ("skinning_pars_vertex", SKINNING_PARS_VERTEX),
    ("skinning_vertex", SKINNING_VERTEX),
    ("begin_vertex", BEGIN_VERTEX),
    ("beginnormal_vertex", BEGINNORMAL_VERTEX),
    ("defaultnormal_vertex", DEFAULTNORMAL_VERTEX),
    ("project_vertex", PROJECT_VERTEX),
    ("worldpos_vertex", WORLDPOS_VERTEX),
    ("clipping_planes_pars_vertex", CLIPPING_PLANES_PARS_VERTEX),
    ("clipping_planes_vertex", CLIPPING_PLANES_VERTEX),
    ("clipping_planes_pars_fragment", CLIPPING_PLANES_PARS_FRAGMENT),
    ("clipping_planes_fragment", CLIPPING_PLANES_FRAGMENT),
    ("fog_pars_vertex", FOG_PARS_VERTEX),
    ("fog_vertex", FOG_VERTEX),
    ("fog_pars_fragment", FOG_PARS_FRAGMENT),
    ("fog_fragment", FOG_FRAGMENT),
    ("map_pars_fragment", MAP_PARS_FRAGMENT),
    ("map_fragment", MAP_FRAGMENT),
    ("alphatest_fragment", ALPHATEST_FRAGMENT),
    ("emissivemap_fragment", EMISSIVEMAP_FRAGMENT),
    ("roughnessmap_fragment", ROUGHNESSMAP_FRAGMENT),
    ("metalnessmap_fragment", METALNESSMAP_FRAGMENT),
    ("aomap_fragment", AOMAP_FRAGMENT),
    ("normal_pars_fragment", NORMAL_PARS_FRAGMENT),
    ("normal_fragment_begin", NORMAL_FRAGMENT_BEGIN),
    ("normal_fragment_maps", NORMAL_FRAGMENT_MAPS),
    ("lights_pars_begin", LIGHTS_PARS_BEGIN),
    ("lights_fragment_begin", LIGHTS_FRAGMENT_BEGIN),
    ("shadowmap_pars_vertex", SHADOWMAP_PARS_VERTEX),
    ("shadowmap_vertex", SHADOWMAP_VERTEX),
    ("shadowmap_pars_fragment", SHADOWMAP_PARS_FRAGMENT),
    ("shadowmask_fragment", SHADOWMASK_FRAGMENT),
    ("transmission_pars_fragment", TRANSMISSION_PARS_FRAGMENT),
    ("transmission_fragment", TRANSMISSION_FRAGMENT),
    ("tonemapping_pars_fragment", TONEMAPPING_PARS_FRAGMENT),
    ("tonemapping_fragment", TONEMAPPING_FRAGMENT),
    ("colorspace_pars_fragment", COLORSPACE_PARS_FRAGMENT),
    ("colorspace_fragment", COLORSPACE_FRAGMENT),
    ("premultiplied_alpha_fragment", PREMULTIPLIED_ALPHA_FRAGMENT),
    ("dithering_fragment", DITHERING_FRAGMENT),
    ("opaque_fragment", OPAQUE_FRAGMENT),
    ("mesh_vertex_pars", MESH_VERTEX_PARS),
    ("mesh_vertex_body", MESH_VERTEX_BODY),
    ("mesh_fragment_pars", MESH_FRAGMENT_PARS),
    ("mesh_fragment_end", MESH_FRAGMENT_END),
];

/// Built-in programs: (shader id, vertex template, fragment template)
///
/// `physical` shares the standard template; the `PHYSICAL` define enables
/// the extra terms.
pub const TEMPLATES: &[(&str, &str, &str)] = &[
    ("basic", BASIC_VERT, BASIC_FRAG),
    ("lambert", LIT_VERT, LAMBERT_FRAG),
    ("phong", LIT_VERT, PHONG_FRAG),
    ("standard", LIT_VERT, STANDARD_FRAG),
    ("physical", LIT_VERT, STANDARD_FRAG),
    ("depth", DEPTH_VERT, DEPTH_FRAG),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_names_unique() {
        let mut names: Vec<&str> = CHUNKS.iter().map(|(n, _)| *n).collect();
        names.sort_unstable();
        let before = names.len();
        names.dedup();
        assert_eq!(before, names.len());
    }

    #[test]
    fn test_chunks_balance_braces() {
        for (name, source) in CHUNKS.iter().copied().chain(TEMPLATES.iter().flat_map(|&(n, v, f)| [(n, v), (n, f)])) {
            assert_eq!(
                source.matches('{').count(),
                source.matches('}').count(),
                "unbalanced braces in {name}"
            );
        }
    }
}
